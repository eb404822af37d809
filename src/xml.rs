//! Minimal namespace-aware element model
//!
//! This is the narrow interface between the mapping engine and the host
//! toolchain's XML infrastructure. The host hands the compiler already-parsed
//! elements and consumes the decompiler's reconstructed ones; this module is
//! deliberately not a general XML framework (no text parsing, no
//! serialization).
//!
//! Attribute and element names are namespace-scoped. An attribute with no
//! namespace belongs to its owning element's vocabulary; anything in a
//! different namespace is "foreign" and gets delegated to extension handlers
//! instead of being rejected.

use serde::{Deserialize, Serialize};

/// A namespace-scoped XML name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XName {
    pub namespace: Option<String>,
    pub local: String,
}

impl XName {
    /// A name with no namespace (unprefixed attributes).
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// A name scoped to `namespace`.
    pub fn scoped(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// Returns `true` if this name is unprefixed or lives in `namespace`.
    pub fn belongs_to(&self, namespace: &str) -> bool {
        match &self.namespace {
            None => true,
            Some(ns) => ns == namespace,
        }
    }
}

/// One attribute on an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: XName,
    pub value: String,
}

/// An element with attributes and child elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: XName,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            name: XName::scoped(namespace, local),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style unprefixed attribute, for constructing test input and
    /// decompiler output.
    #[must_use]
    pub fn with_attribute(mut self, local: &str, value: impl Into<String>) -> Self {
        self.set_attribute(local, value);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn set_attribute(&mut self, local: &str, value: impl Into<String>) {
        self.attributes.push(Attribute {
            name: XName::local(local),
            value: value.into(),
        });
    }

    /// Looks up an unprefixed attribute by local name.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, local: &str) -> bool {
        self.attribute(local).is_some()
    }
}
