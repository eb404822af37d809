//! Token ⇄ packed-integer codec for firewall exception rows
//!
//! The persisted row format stores enums and bitfields as the integers the
//! Windows Firewall API consumes at install time; the authoring vocabulary
//! uses readable tokens. This module is the single source of truth for the
//! two-way mapping: the compiler encodes tokens into packed values, the
//! decompiler decodes them back. Everything here is pure and total over its
//! input domain.
//!
//! # Compatibility
//!
//! Decode order for interface types (Wireless, Lan, RemoteAccess) and the
//! `i32::MAX` "All" sentinel are wire-compatibility contracts with rows
//! produced by earlier releases; do not reorder.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// IP protocol for a port-based exception
///
/// Packed values are the IPPROTO numbers the firewall API expects.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum Protocol {
    /// Transmission Control Protocol
    #[strum(serialize = "tcp")]
    Tcp,
    /// User Datagram Protocol
    #[strum(serialize = "udp")]
    Udp,
}

impl Protocol {
    pub const fn packed(self) -> i32 {
        match self {
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
        }
    }

    /// Decodes a stored protocol number. Unknown values decode to `None`,
    /// which the decompiler renders as "no attribute".
    pub const fn from_packed(value: i32) -> Option<Self> {
        match value {
            6 => Some(Protocol::Tcp),
            17 => Some(Protocol::Udp),
            _ => None,
        }
    }
}

/// Firewall profile the exception applies to
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum Profile {
    #[strum(serialize = "domain")]
    Domain,
    #[strum(serialize = "private")]
    Private,
    #[strum(serialize = "public")]
    Public,
    /// All profiles; the compiled default when no Profile attribute is given
    #[strum(serialize = "all")]
    All,
}

impl Profile {
    pub const fn packed(self) -> i32 {
        match self {
            Profile::Domain => 1,
            Profile::Private => 2,
            Profile::Public => 4,
            Profile::All => i32::MAX,
        }
    }

    pub const fn from_packed(value: i32) -> Option<Self> {
        match value {
            1 => Some(Profile::Domain),
            2 => Some(Profile::Private),
            4 => Some(Profile::Public),
            i32::MAX => Some(Profile::All),
            _ => None,
        }
    }
}

/// Rule direction; authored through the yes/no `Outbound` attribute
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
pub enum Direction {
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "out")]
    Out,
}

impl Direction {
    pub const fn packed(self) -> i32 {
        match self {
            Direction::In => 1,
            Direction::Out => 2,
        }
    }

    pub const fn from_packed(value: i32) -> Option<Self> {
        match value {
            1 => Some(Direction::In),
            2 => Some(Direction::Out),
            _ => None,
        }
    }
}

/// One interface-type token; rows store the comma-joined token set
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum InterfaceType {
    Wireless,
    Lan,
    RemoteAccess,
}

impl InterfaceType {
    pub const fn bit(self) -> i32 {
        match self {
            InterfaceType::Wireless => 0x1,
            InterfaceType::Lan => 0x2,
            InterfaceType::RemoteAccess => 0x4,
        }
    }
}

/// Sentinel meaning "unconstrained by interface type"
pub const INTERFACE_TYPES_ALL: i32 = i32::MAX;

/// Token form of the unconstrained sentinel
pub const INTERFACE_TYPES_ALL_TOKEN: &str = "All";

/// Decodes a packed interface-type value into its token form.
///
/// The sentinel decodes to `All`; otherwise each set bit contributes its
/// token in the fixed order Wireless, Lan, RemoteAccess.
pub fn decode_interface_types(value: i32) -> String {
    if value == INTERFACE_TYPES_ALL {
        return INTERFACE_TYPES_ALL_TOKEN.to_string();
    }

    let mut tokens = String::new();
    for interface_type in InterfaceType::iter() {
        if value & interface_type.bit() != 0 {
            if !tokens.is_empty() {
                tokens.push(',');
            }
            tokens.push_str(interface_type.as_ref());
        }
    }
    tokens
}

/// Encodes a comma-joined token set back into the packed value.
///
/// `All` maps to the sentinel; unrecognized tokens contribute no bits.
pub fn encode_interface_types(tokens: &str) -> i32 {
    if tokens == INTERFACE_TYPES_ALL_TOKEN {
        return INTERFACE_TYPES_ALL;
    }

    tokens
        .split(',')
        .filter_map(|token| token.trim().parse::<InterfaceType>().ok())
        .fold(0, |bits, interface_type| bits | interface_type.bit())
}

/// Packed per-exception behavior flags (row column 6)
///
/// `EdgeTraversal` defaults to set, so the packed default is `0x2`. The
/// decompiler emits `EdgeTraversal="no"` only when the bit is clear and
/// `IgnoreFailure="yes"` only when that bit is set; omission always means
/// the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExceptionFlags(i32);

impl ExceptionFlags {
    pub const IGNORE_FAILURES: i32 = 0x1;
    pub const EDGE_TRAVERSAL: i32 = 0x2;

    pub const fn from_packed(value: i32) -> Self {
        Self(value)
    }

    pub const fn packed(self) -> i32 {
        self.0
    }

    pub const fn ignore_failures(self) -> bool {
        self.0 & Self::IGNORE_FAILURES != 0
    }

    pub const fn edge_traversal(self) -> bool {
        self.0 & Self::EDGE_TRAVERSAL != 0
    }

    pub const fn with_ignore_failures(self, on: bool) -> Self {
        if on {
            Self(self.0 | Self::IGNORE_FAILURES)
        } else {
            Self(self.0 & !Self::IGNORE_FAILURES)
        }
    }

    pub const fn with_edge_traversal(self, on: bool) -> Self {
        if on {
            Self(self.0 | Self::EDGE_TRAVERSAL)
        } else {
            Self(self.0 & !Self::EDGE_TRAVERSAL)
        }
    }
}

impl Default for ExceptionFlags {
    /// EdgeTraversal on, IgnoreFailures off.
    fn default() -> Self {
        Self(Self::EDGE_TRAVERSAL)
    }
}
