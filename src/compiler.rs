//! Compiler for the firewall exception vocabulary
//!
//! Transforms one `FirewallException` element, together with the context it
//! is attached under, into a validated [`FirewallExceptionRecord`] registered
//! in the compilation [`Section`]. Validation accumulates diagnostics rather
//! than short-circuiting, so one malformed element reports every problem it
//! has in a single pass; the record is only materialized when the element
//! produced no errors.
//!
//! The attachment context is a closed set: `File`, `Component`,
//! `ServiceConfig`, and `ServiceInstall` parents each supply their own
//! inherited defaults (owning component, file id, service name), modeled as
//! the [`ParentContext`] tagged union.

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::core::codec::{
    Direction, ExceptionFlags, Profile, Protocol, decode_interface_types,
};
use crate::core::record::FirewallExceptionRecord;
use crate::diag::{DiagnosticKind, DiagnosticSink};
use crate::validators::{is_legal_identifier, parse_bounded_integer, parse_yes_no};
use crate::xml::{Attribute, Element};

/// Namespace of the firewall exception vocabulary.
pub const NAMESPACE: &str = "http://fwext.dev/schemas/firewall/v1";

/// Custom action that applies compiled exceptions at install time.
pub const SCHED_INSTALL_ACTION: &str = "SchedFirewallExceptionsInstall";

/// Custom action that removes compiled exceptions at uninstall time.
pub const SCHED_UNINSTALL_ACTION: &str = "SchedFirewallExceptionsUninstall";

/// Target platform of the compilation, carried on scheduling-action
/// references.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum Platform {
    #[strum(serialize = "x86")]
    X86,
    #[strum(serialize = "x64")]
    X64,
    #[strum(serialize = "arm64")]
    Arm64,
}

/// A cross-reference edge registered alongside a compiled record, for the
/// surrounding toolchain to resolve after compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reference {
    /// The record's Program derives from a file entry; the builder verifies
    /// the file exists.
    File { file_id: String },
    /// Scheduling custom action; emitted install/uninstall pair per valid
    /// record.
    CustomAction { action: String, platform: Platform },
}

/// The parent an exception element is nested under, with the values that
/// context supplies as inherited defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentContext {
    File {
        component_id: String,
        file_id: String,
    },
    Component {
        component_id: String,
    },
    ServiceConfig {
        component_id: String,
        service_name: String,
    },
    ServiceInstall {
        component_id: String,
        service_name: String,
    },
}

impl ParentContext {
    pub fn component_id(&self) -> &str {
        match self {
            ParentContext::File { component_id, .. }
            | ParentContext::Component { component_id }
            | ParentContext::ServiceConfig { component_id, .. }
            | ParentContext::ServiceInstall { component_id, .. } => component_id,
        }
    }

    pub fn file_id(&self) -> Option<&str> {
        match self {
            ParentContext::File { file_id, .. } => Some(file_id),
            _ => None,
        }
    }

    pub fn service_name(&self) -> Option<&str> {
        match self {
            ParentContext::ServiceConfig { service_name, .. }
            | ParentContext::ServiceInstall { service_name, .. } => Some(service_name),
            _ => None,
        }
    }

    pub fn element_name(&self) -> &'static str {
        match self {
            ParentContext::File { .. } => "File",
            ParentContext::Component { .. } => "Component",
            ParentContext::ServiceConfig { .. } => "ServiceConfig",
            ParentContext::ServiceInstall { .. } => "ServiceInstall",
        }
    }
}

/// Handler for attributes and elements in foreign namespaces. The compiler
/// delegates anything outside [`NAMESPACE`] here instead of rejecting it.
pub trait ExtensionHandler {
    fn extension_attribute(&mut self, element: &Element, attribute: &Attribute) {
        let _ = (element, attribute);
    }

    fn extension_element(&mut self, parent: &Element, child: &Element) {
        let _ = (parent, child);
    }
}

/// Default handler: foreign-namespace content is ignored.
#[derive(Debug, Default)]
pub struct NoopExtensions;

impl ExtensionHandler for NoopExtensions {}

/// Symbol store of one compilation unit. Records and references are appended
/// as elements compile and never mutated afterwards; identifier uniqueness is
/// enforced across the whole unit.
#[derive(Debug, Default)]
pub struct Section {
    records: Vec<FirewallExceptionRecord>,
    references: Vec<Reference>,
    ids: HashSet<String>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a compiled record, rejecting duplicate identifiers with a
    /// diagnostic.
    pub fn add_record(
        &mut self,
        record: FirewallExceptionRecord,
        diagnostics: &mut DiagnosticSink,
    ) -> bool {
        if !self.ids.insert(record.id.clone()) {
            diagnostics.error(DiagnosticKind::DuplicateId {
                id: record.id.clone(),
            });
            return false;
        }

        debug!(id = %record.id, component = %record.component_ref, "registered firewall exception");
        self.records.push(record);
        true
    }

    pub fn add_reference(&mut self, reference: Reference) {
        self.references.push(reference);
    }

    pub fn records(&self) -> &[FirewallExceptionRecord] {
        &self.records
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }
}

/// Synthesizes a stable identifier for an exception that supplied none.
///
/// Derived from the display name, the remote address list, and the owning
/// component, so identical input compiles to the identical identifier on
/// every run.
pub fn synthesize_id(
    name: Option<&str>,
    remote_addresses: Option<&str>,
    component_id: &str,
) -> String {
    let mut hasher = Sha256::new();
    for part in [
        name.unwrap_or_default(),
        remote_addresses.unwrap_or_default(),
        component_id,
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }

    let digest = hasher.finalize();
    let mut id = String::from("fex");
    for byte in &digest[..8] {
        let _ = write!(id, "{byte:02x}");
    }
    id
}

/// Compiles firewall exception elements into one [`Section`].
pub struct Compiler {
    platform: Platform,
    extensions: Box<dyn ExtensionHandler>,
    pub section: Section,
    pub diagnostics: DiagnosticSink,
}

impl Compiler {
    pub fn new(platform: Platform) -> Self {
        Self::with_extensions(platform, Box::new(NoopExtensions))
    }

    pub fn with_extensions(platform: Platform, extensions: Box<dyn ExtensionHandler>) -> Self {
        Self {
            platform,
            extensions,
            section: Section::new(),
            diagnostics: DiagnosticSink::new(),
        }
    }

    /// Consumes the compiler, yielding the symbol store and the diagnostics
    /// of the run.
    pub fn into_parts(self) -> (Section, DiagnosticSink) {
        (self.section, self.diagnostics)
    }

    /// Entry point for one element handed over by the host parser. Only the
    /// `FirewallException` element is part of this vocabulary; anything else
    /// under a supported parent is a schema violation.
    pub fn parse_element(&mut self, context: &ParentContext, element: &Element) {
        if element.name.belongs_to(NAMESPACE) && element.name.local == "FirewallException" {
            self.parse_firewall_exception(context, element);
        } else {
            self.diagnostics.error(DiagnosticKind::UnexpectedElement {
                parent: context.element_name().to_string(),
                child: element.name.local.clone(),
            });
        }
    }

    /// Parses one `FirewallException` element: a single left-to-right
    /// attribute pass, then `RemoteAddress` children, then the invariants
    /// that span several attributes. Row creation is all-or-nothing per
    /// element.
    fn parse_firewall_exception(&mut self, context: &ParentContext, element: &Element) {
        let errors_before = self.diagnostics.error_count();
        let element_name = element.name.local.as_str();

        let mut id = None;
        let mut name = None;
        let mut file: Option<String> = None;
        let mut program = None;
        let mut service = None;
        let mut port = None;
        let mut protocol = None;
        let mut profile = None;
        let mut scope = None;
        let mut remote_addresses: Option<String> = None;
        let mut description = None;
        let mut direction = None;
        let mut interface_types = None;
        let mut flags = ExceptionFlags::default();

        for attribute in &element.attributes {
            if !attribute.name.belongs_to(NAMESPACE) {
                self.extensions.extension_attribute(element, attribute);
                continue;
            }

            let value = attribute.value.as_str();
            match attribute.name.local.as_str() {
                "Id" => {
                    id = self.identifier_value(element_name, attribute);
                }
                "Name" => {
                    name = self.attribute_value(element_name, attribute);
                }
                "File" => {
                    if context.file_id().is_some() {
                        self.illegal_when_nested(element_name, "File", context);
                    } else {
                        file = self.identifier_value(element_name, attribute);
                    }
                }
                "IgnoreFailure" => {
                    if self.yes_no_value(element_name, attribute) == Some(true) {
                        flags = flags.with_ignore_failures(true);
                    }
                }
                "EdgeTraversal" => {
                    if self.yes_no_value(element_name, attribute) == Some(false) {
                        flags = flags.with_edge_traversal(false);
                    }
                }
                "Program" => {
                    if context.file_id().is_some() {
                        self.illegal_when_nested(element_name, "Program", context);
                    } else {
                        program = self.attribute_value(element_name, attribute);
                    }
                }
                "Service" => {
                    if context.service_name().is_some() {
                        self.illegal_when_nested(element_name, "Service", context);
                    } else {
                        service = self.attribute_value(element_name, attribute);
                    }
                }
                "Port" => {
                    port = self.attribute_value(element_name, attribute);
                }
                "Protocol" => match value.parse::<Protocol>() {
                    Ok(parsed) => protocol = Some(parsed),
                    Err(_) => self.illegal_value(element_name, attribute, "tcp, udp"),
                },
                "Scope" => {
                    scope = Some(value.to_string());
                    match value {
                        "any" => remote_addresses = Some("*".to_string()),
                        "localSubnet" => remote_addresses = Some("LocalSubnet".to_string()),
                        _ => self.illegal_value(element_name, attribute, "any, localSubnet"),
                    }
                }
                "InterfaceTypes" => {
                    interface_types = self.interface_types_value(element_name, attribute);
                }
                "Profile" => match value.parse::<Profile>() {
                    Ok(parsed) => profile = Some(parsed),
                    Err(_) => {
                        self.illegal_value(element_name, attribute, "domain, private, public, all");
                    }
                },
                "Description" => {
                    description = self.attribute_value(element_name, attribute);
                }
                "Outbound" => {
                    direction = self.yes_no_value(element_name, attribute).map(|outbound| {
                        if outbound {
                            Direction::Out
                        } else {
                            Direction::In
                        }
                    });
                }
                _ => {
                    self.diagnostics.error(DiagnosticKind::UnexpectedAttribute {
                        element: element_name.to_string(),
                        attribute: attribute.name.local.clone(),
                    });
                }
            }
        }

        for child in &element.children {
            if !child.name.belongs_to(NAMESPACE) {
                self.extensions.extension_element(element, child);
                continue;
            }

            match child.name.local.as_str() {
                "RemoteAddress" => {
                    if scope.is_some() {
                        self.diagnostics
                            .error(DiagnosticKind::IllegalRemoteAddressWithScope);
                    } else {
                        self.parse_remote_address(child, &mut remote_addresses);
                    }
                }
                _ => {
                    self.diagnostics.error(DiagnosticKind::UnexpectedElement {
                        parent: element_name.to_string(),
                        child: child.name.local.clone(),
                    });
                }
            }
        }

        let id = id.unwrap_or_else(|| {
            synthesize_id(
                name.as_deref(),
                remote_addresses.as_deref(),
                context.component_id(),
            )
        });

        if service.is_none() {
            service = context.service_name().map(str::to_string);
        }

        if name.is_none() {
            self.diagnostics.error(DiagnosticKind::ExpectedAttribute {
                element: element_name.to_string(),
                attribute: "Name".to_string(),
            });
        }

        if remote_addresses.is_none() {
            self.diagnostics
                .error(DiagnosticKind::ExpectedAttributeOrElement {
                    element: element_name.to_string(),
                    attribute: "Scope".to_string(),
                    child: "RemoteAddress".to_string(),
                });
        }

        if program.is_some() && file.is_some() {
            self.diagnostics
                .error(DiagnosticKind::IllegalAttributeWithOtherAttribute {
                    element: element_name.to_string(),
                    attribute: "File".to_string(),
                    other: "Program".to_string(),
                });
        }

        // The exception must name something to except: a file (nested or by
        // attribute), a program, or a port.
        if context.file_id().is_none() && file.is_none() && program.is_none() && port.is_none() {
            self.diagnostics.error(DiagnosticKind::NoExceptionSpecified);
        }

        if self.diagnostics.error_count() != errors_before {
            return;
        }

        let (Some(name), Some(remote_addresses)) = (name, remote_addresses) else {
            return;
        };

        // File attribute and File parent context are equivalent from here on.
        let file_id = file.or_else(|| context.file_id().map(str::to_string));
        let program = if let Some(file_id) = &file_id {
            self.section.add_reference(Reference::File {
                file_id: file_id.clone(),
            });
            Some(format!("[#{file_id}]"))
        } else {
            program
        };

        if port.is_some() && protocol.is_none() {
            protocol = Some(Protocol::Tcp);
        }

        let record = FirewallExceptionRecord {
            id,
            name,
            remote_addresses,
            port,
            protocol,
            program,
            attributes: Some(flags),
            profile: Some(profile.unwrap_or(Profile::All)),
            component_ref: context.component_id().to_string(),
            description,
            direction: Some(direction.unwrap_or(Direction::In)),
            service,
            interface_types,
        };

        if self.section.add_record(record, &mut self.diagnostics) {
            for action in [SCHED_INSTALL_ACTION, SCHED_UNINSTALL_ACTION] {
                self.section.add_reference(Reference::CustomAction {
                    action: action.to_string(),
                    platform: self.platform,
                });
            }
        }
    }

    /// Parses one `RemoteAddress` child, appending its `Value` to the
    /// comma-joined address list in document order.
    fn parse_remote_address(&mut self, element: &Element, remote_addresses: &mut Option<String>) {
        let element_name = element.name.local.as_str();
        let mut address = None;

        for attribute in &element.attributes {
            if !attribute.name.belongs_to(NAMESPACE) {
                self.extensions.extension_attribute(element, attribute);
                continue;
            }

            match attribute.name.local.as_str() {
                "Value" => {
                    address = self.attribute_value(element_name, attribute);
                }
                _ => {
                    self.diagnostics.error(DiagnosticKind::UnexpectedAttribute {
                        element: element_name.to_string(),
                        attribute: attribute.name.local.clone(),
                    });
                }
            }
        }

        for child in &element.children {
            if !child.name.belongs_to(NAMESPACE) {
                self.extensions.extension_element(element, child);
            } else {
                self.diagnostics.error(DiagnosticKind::UnexpectedElement {
                    parent: element_name.to_string(),
                    child: child.name.local.clone(),
                });
            }
        }

        if let Some(address) = address {
            *remote_addresses = Some(match remote_addresses.take() {
                None => address,
                Some(existing) => format!("{existing},{address}"),
            });
        } else {
            self.diagnostics.error(DiagnosticKind::ExpectedAttribute {
                element: element_name.to_string(),
                attribute: "Value".to_string(),
            });
        }
    }

    fn attribute_value(&mut self, element: &str, attribute: &Attribute) -> Option<String> {
        if attribute.value.is_empty() {
            self.diagnostics
                .error(DiagnosticKind::IllegalEmptyAttributeValue {
                    element: element.to_string(),
                    attribute: attribute.name.local.clone(),
                });
            return None;
        }
        Some(attribute.value.clone())
    }

    fn identifier_value(&mut self, element: &str, attribute: &Attribute) -> Option<String> {
        if is_legal_identifier(&attribute.value) {
            Some(attribute.value.clone())
        } else {
            self.diagnostics.error(DiagnosticKind::IllegalIdentifier {
                element: element.to_string(),
                attribute: attribute.name.local.clone(),
                value: attribute.value.clone(),
            });
            None
        }
    }

    fn yes_no_value(&mut self, element: &str, attribute: &Attribute) -> Option<bool> {
        let parsed = parse_yes_no(&attribute.value);
        if parsed.is_none() {
            self.diagnostics.error(DiagnosticKind::IllegalYesNoValue {
                element: element.to_string(),
                attribute: attribute.name.local.clone(),
                value: attribute.value.clone(),
            });
        }
        parsed
    }

    /// The InterfaceTypes attribute carries the packed integer; the row
    /// stores its decoded token form.
    fn interface_types_value(&mut self, element: &str, attribute: &Attribute) -> Option<String> {
        let max = i64::from(i32::MAX);
        match parse_bounded_integer(&attribute.value, 0, max) {
            Some(packed) => {
                #[allow(clippy::cast_possible_truncation)]
                let tokens = decode_interface_types(packed as i32);
                (!tokens.is_empty()).then_some(tokens)
            }
            None => {
                self.diagnostics.error(DiagnosticKind::IntegerOutOfRange {
                    element: element.to_string(),
                    attribute: attribute.name.local.clone(),
                    value: attribute.value.clone(),
                    min: 0,
                    max,
                });
                None
            }
        }
    }

    fn illegal_when_nested(&mut self, element: &str, attribute: &str, context: &ParentContext) {
        self.diagnostics
            .error(DiagnosticKind::IllegalAttributeWhenNested {
                element: element.to_string(),
                attribute: attribute.to_string(),
                parent: context.element_name().to_string(),
            });
    }

    fn illegal_value(&mut self, element: &str, attribute: &Attribute, legal: &str) {
        self.diagnostics.error(DiagnosticKind::IllegalAttributeValue {
            element: element.to_string(),
            attribute: attribute.name.local.clone(),
            value: attribute.value.clone(),
            legal: legal.to_string(),
        });
    }
}
