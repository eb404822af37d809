//! Decompiler: stored rows back into the authoring vocabulary
//!
//! The inverse of the compiler, in two strictly sequential passes:
//!
//! 1. **Build**: every row of the firewall exception table becomes one
//!    `FirewallException` element, in row insertion order. Attributes are
//!    emitted only for fields that are present and non-default; the
//!    comma-joined address field is split back into a `Scope` shorthand or
//!    `RemoteAddress` children.
//! 2. **Attach**: each built element is appended under its owning `Component`
//!    element, resolved by id through the host-maintained [`ElementIndex`].
//!    An unknown component downgrades to a warning and leaves that element
//!    unattached; the remaining rows still decompile.
//!
//! The pass split exists because a row may reference a component whose
//! element had not been built yet when the row was visited; the index is
//! fully populated before any attachment is attempted.

use std::collections::HashMap;

use tracing::warn;

use crate::compiler::NAMESPACE;
use crate::core::codec::{Direction, Profile, encode_interface_types};
use crate::core::error::Result;
use crate::core::record::{EXCEPTION_TABLE, FirewallExceptionRecord, Table};
use crate::diag::{DiagnosticKind, DiagnosticSink};
use crate::xml::Element;

/// Index of reconstructed elements keyed by tag and identifier, maintained by
/// the host decompiler framework. The host populates it with the elements it
/// rebuilds itself (components in particular); this extension resolves owning
/// components through it during the attach pass.
#[derive(Debug, Default)]
pub struct ElementIndex {
    elements: HashMap<(String, String), Element>,
}

impl ElementIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `element` under its tag and the given identifier.
    pub fn insert(&mut self, id: impl Into<String>, element: Element) {
        self.elements
            .insert((element.name.local.clone(), id.into()), element);
    }

    pub fn get(&self, tag: &str, id: &str) -> Option<&Element> {
        self.elements.get(&(tag.to_string(), id.to_string()))
    }

    pub fn get_mut(&mut self, tag: &str, id: &str) -> Option<&mut Element> {
        self.elements.get_mut(&(tag.to_string(), id.to_string()))
    }
}

/// One reconstructed element still waiting for its owning component.
#[derive(Debug)]
struct PendingElement {
    row_key: String,
    component_ref: String,
    element: Element,
}

/// Decompiles the firewall exception table.
#[derive(Debug, Default)]
pub struct Decompiler {
    pub diagnostics: DiagnosticSink,
    pending: Vec<PendingElement>,
}

impl Decompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims and decompiles `table` if it is the firewall exception table.
    /// Returns `false` for any other table so the host can route it to a
    /// different extension.
    ///
    /// # Errors
    ///
    /// Fails only on rows too malformed to describe an exception; see
    /// [`FirewallExceptionRecord::from_row`].
    pub fn try_decompile_table(&mut self, table: &Table) -> Result<bool> {
        if table.name != EXCEPTION_TABLE {
            return Ok(false);
        }

        for row in &table.rows {
            let record = FirewallExceptionRecord::from_row(row)?;
            let element = project_record(&record);
            self.pending.push(PendingElement {
                row_key: record.id,
                component_ref: record.component_ref,
                element,
            });
        }
        Ok(true)
    }

    /// Read access to the built elements, keyed by source row, before they
    /// are attached. Downstream consumers use this to post-process elements
    /// in place.
    pub fn indexed_elements(&self) -> impl Iterator<Item = (&str, &Element)> {
        self.pending
            .iter()
            .map(|p| (p.row_key.as_str(), &p.element))
    }

    /// Attach pass: appends every built element under its owning component in
    /// `index`. Elements whose component is unknown are returned unattached,
    /// each having raised a warning.
    pub fn finalize(&mut self, index: &mut ElementIndex) -> Vec<Element> {
        let mut unattached = Vec::new();

        for pending in self.pending.drain(..) {
            match index.get_mut("Component", &pending.component_ref) {
                Some(component) => component.children.push(pending.element),
                None => {
                    warn!(
                        row = %pending.row_key,
                        component = %pending.component_ref,
                        "firewall exception references unknown component"
                    );
                    self.diagnostics.warning(DiagnosticKind::ExpectedForeignRow {
                        table: EXCEPTION_TABLE.to_string(),
                        key: pending.row_key,
                        target: "Component".to_string(),
                        target_id: pending.component_ref,
                    });
                    unattached.push(pending.element);
                }
            }
        }
        unattached
    }
}

/// Projects one record into its `FirewallException` element.
fn project_record(record: &FirewallExceptionRecord) -> Element {
    let mut element = Element::new(NAMESPACE, "FirewallException")
        .with_attribute("Id", &record.id)
        .with_attribute("Name", &record.name);

    split_remote_addresses(&mut element, &record.remote_addresses);

    if let Some(port) = &record.port {
        element.set_attribute("Port", port);
    }

    if let Some(protocol) = record.protocol {
        element.set_attribute("Protocol", protocol.as_ref());
    }

    if let Some(program) = &record.program {
        element.set_attribute("Program", program);
    }

    if let Some(flags) = record.attributes {
        if flags.ignore_failures() {
            element.set_attribute("IgnoreFailure", "yes");
        }
        // EdgeTraversal defaults to on; only the off state is spelled out.
        if !flags.edge_traversal() {
            element.set_attribute("EdgeTraversal", "no");
        }
    }

    // Default-valued profile and direction are omitted; their absence
    // compiles back to the same packed values.
    if let Some(profile) = record.profile
        && profile != Profile::All
    {
        element.set_attribute("Profile", profile.as_ref());
    }

    if let Some(description) = &record.description {
        element.set_attribute("Description", description);
    }

    if record.direction == Some(Direction::Out) {
        element.set_attribute("Outbound", "yes");
    }

    if let Some(service) = &record.service {
        element.set_attribute("Service", service);
    }

    if let Some(interface_types) = &record.interface_types {
        let packed = encode_interface_types(interface_types);
        element.set_attribute("InterfaceTypes", packed.to_string());
    }

    element
}

/// Splits the comma-joined address field. A single token collapses to the
/// `Scope` shorthand when it is one of the reserved values; everything else
/// becomes `RemoteAddress` children in field order.
fn split_remote_addresses(element: &mut Element, remote_addresses: &str) {
    let addresses: Vec<&str> = remote_addresses.split(',').collect();

    if let [single] = addresses.as_slice() {
        match *single {
            "*" => element.set_attribute("Scope", "any"),
            "LocalSubnet" => element.set_attribute("Scope", "localSubnet"),
            address => element.children.push(remote_address(address)),
        }
    } else {
        for address in addresses {
            element.children.push(remote_address(address));
        }
    }
}

fn remote_address(address: &str) -> Element {
    Element::new(NAMESPACE, "RemoteAddress").with_attribute("Value", address)
}
