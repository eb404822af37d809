//! Integration tests for fwext
//!
//! These exercise the full mapping engine end to end: compiling authored
//! elements into records, persisting them as rows, decompiling the rows back
//! into elements, and recompiling the result. The core contract is
//! idempotence - compile, decompile, compile must reproduce the first
//! record field for field.

use fwext::core::codec::{decode_interface_types, encode_interface_types};
use fwext::{
    Compiler, Decompiler, Direction, Element, ElementIndex, EXCEPTION_TABLE,
    FirewallExceptionRecord, NAMESPACE, ParentContext, Platform, Profile, Protocol, Table,
};
use proptest::prelude::*;

fn component_context() -> ParentContext {
    ParentContext::Component {
        component_id: "MainComponent".to_string(),
    }
}

fn exception(attributes: &[(&str, &str)]) -> Element {
    let mut element = Element::new(NAMESPACE, "FirewallException");
    for (name, value) in attributes {
        element.set_attribute(name, *value);
    }
    element
}

/// Compiles a single element, asserting success, and returns its record.
fn compile(context: &ParentContext, element: &Element) -> FirewallExceptionRecord {
    let mut compiler = Compiler::new(Platform::X64);
    compiler.parse_element(context, element);
    assert!(
        !compiler.diagnostics.has_errors(),
        "unexpected diagnostics: {:?}",
        compiler.diagnostics.diagnostics()
    );
    let (section, _) = compiler.into_parts();
    let mut records = section.records().to_vec();
    assert_eq!(records.len(), 1);
    records.remove(0)
}

/// Decompiles a single record's row and returns the attached element.
fn decompile(record: &FirewallExceptionRecord) -> Element {
    let table = Table {
        name: EXCEPTION_TABLE.to_string(),
        rows: vec![record.to_row()],
    };

    let mut index = ElementIndex::new();
    index.insert(
        record.component_ref.clone(),
        Element::new(NAMESPACE, "Component").with_attribute("Id", &record.component_ref),
    );

    let mut decompiler = Decompiler::new();
    assert!(decompiler.try_decompile_table(&table).unwrap());
    let unattached = decompiler.finalize(&mut index);
    assert!(unattached.is_empty());
    assert!(!decompiler.diagnostics.has_errors());

    let component = index.get("Component", &record.component_ref).unwrap();
    assert_eq!(component.children.len(), 1);
    component.children[0].clone()
}

/// compile ∘ decompile ∘ compile = compile
fn assert_round_trip(element: &Element) -> FirewallExceptionRecord {
    let context = component_context();
    let first = compile(&context, element);
    let reconstructed = decompile(&first);
    let second = compile(&context, &reconstructed);
    assert_eq!(second, first);
    first
}

#[test]
fn test_round_trip_minimal_port_exception() {
    let record = assert_round_trip(&exception(&[
        ("Name", "web server"),
        ("Port", "80"),
        ("Scope", "any"),
    ]));
    assert_eq!(record.protocol, Some(Protocol::Tcp));
}

#[test]
fn test_round_trip_fully_specified_exception() {
    assert_round_trip(&exception(&[
        ("Id", "fexEverything"),
        ("Name", "kitchen sink"),
        ("Port", "8000-9000"),
        ("Protocol", "udp"),
        ("Program", "[INSTALLDIR]server.exe"),
        ("Scope", "localSubnet"),
        ("Profile", "domain"),
        ("Description", "every attribute at once"),
        ("Outbound", "yes"),
        ("IgnoreFailure", "yes"),
        ("EdgeTraversal", "no"),
        ("Service", "Spooler"),
        ("InterfaceTypes", "6"),
    ]));
}

#[test]
fn test_round_trip_remote_address_children() {
    let element = exception(&[("Name", "multi"), ("Port", "53")])
        .with_child(Element::new(NAMESPACE, "RemoteAddress").with_attribute("Value", "10.0.0.1"))
        .with_child(Element::new(NAMESPACE, "RemoteAddress").with_attribute("Value", "10.0.0.2"));

    let record = assert_round_trip(&element);
    assert_eq!(record.remote_addresses, "10.0.0.1,10.0.0.2");
}

#[test]
fn test_round_trip_preserves_file_derived_program() {
    let context = ParentContext::File {
        component_id: "MainComponent".to_string(),
        file_id: "ServerExe".to_string(),
    };
    let first = compile(&context, &exception(&[("Name", "server"), ("Scope", "any")]));
    assert_eq!(first.program.as_deref(), Some("[#ServerExe]"));

    // The reconstructed element carries the resolved Program form, so it
    // recompiles under a plain Component parent to the same record.
    let reconstructed = decompile(&first);
    let second = compile(&component_context(), &reconstructed);
    assert_eq!(second, first);
}

#[test]
fn test_default_fidelity() {
    let record = compile(
        &component_context(),
        &exception(&[("Name", "defaults"), ("Port", "80"), ("Scope", "any")]),
    );

    assert_eq!(record.profile, Some(Profile::All));
    assert_eq!(record.profile.unwrap().packed(), i32::MAX);
    assert_eq!(record.direction, Some(Direction::In));
    let flags = record.attributes.unwrap();
    assert_eq!(flags.packed(), 0x2);

    let element = decompile(&record);
    assert!(element.attribute("Profile").is_none());
    assert!(element.attribute("Outbound").is_none());
    assert!(element.attribute("EdgeTraversal").is_none());
    assert!(element.attribute("IgnoreFailure").is_none());
}

#[test]
fn test_address_shorthand_equivalence() {
    let any = compile(
        &component_context(),
        &exception(&[("Name", "a"), ("Port", "1"), ("Scope", "any")]),
    );
    assert_eq!(any.remote_addresses, "*");
    assert_eq!(decompile(&any).attribute("Scope"), Some("any"));

    let local = compile(
        &component_context(),
        &exception(&[("Name", "b"), ("Port", "1"), ("Scope", "localSubnet")]),
    );
    assert_eq!(local.remote_addresses, "LocalSubnet");
    assert_eq!(decompile(&local).attribute("Scope"), Some("localSubnet"));
}

#[test]
fn test_mutual_exclusion_produces_single_diagnostic() {
    let mut compiler = Compiler::new(Platform::X64);
    compiler.parse_element(
        &component_context(),
        &exception(&[
            ("Name", "both"),
            ("Scope", "any"),
            ("File", "f1"),
            ("Program", "p"),
        ]),
    );

    assert_eq!(compiler.diagnostics.error_count(), 1);
    assert!(compiler.section.records().is_empty());
}

#[test]
fn test_interface_types_packing() {
    assert_eq!(decode_interface_types(0x3), "Wireless,Lan");
    assert_eq!(decode_interface_types(2_147_483_647), "All");
    assert_eq!(encode_interface_types("All"), 2_147_483_647);
    assert_eq!(encode_interface_types("Lan,RemoteAccess"), 0x6);
}

#[test]
fn test_missing_owner_does_not_abort_run() {
    let context = component_context();
    let attached = compile(
        &context,
        &exception(&[("Name", "ok"), ("Port", "80"), ("Scope", "any")]),
    );
    let mut orphan = compile(
        &context,
        &exception(&[("Name", "orphan"), ("Port", "81"), ("Scope", "any")]),
    );
    orphan.component_ref = "NoSuchComponent".to_string();

    let table = Table {
        name: EXCEPTION_TABLE.to_string(),
        rows: vec![attached.to_row(), orphan.to_row()],
    };
    let mut index = ElementIndex::new();
    index.insert(
        "MainComponent",
        Element::new(NAMESPACE, "Component").with_attribute("Id", "MainComponent"),
    );

    let mut decompiler = Decompiler::new();
    decompiler.try_decompile_table(&table).unwrap();
    let unattached = decompiler.finalize(&mut index);

    assert_eq!(unattached.len(), 1);
    assert!(!decompiler.diagnostics.has_errors());
    assert_eq!(decompiler.diagnostics.len(), 1);
    assert_eq!(
        index
            .get("Component", "MainComponent")
            .unwrap()
            .children
            .len(),
        1
    );
}

proptest! {
    /// Any packed interface-type value survives decode -> encode unchanged
    /// once restricted to the known bits (unknown bits never decode to
    /// tokens, so they are dropped by design).
    #[test]
    fn prop_interface_types_decode_encode(value in 0i32..=7) {
        let tokens = decode_interface_types(value);
        prop_assert_eq!(encode_interface_types(&tokens), value);
    }

    /// Token sets round-trip through the packed form in canonical order.
    #[test]
    fn prop_interface_types_encode_decode(bits in 1i32..=7) {
        let tokens = decode_interface_types(bits);
        let packed = encode_interface_types(&tokens);
        prop_assert_eq!(decode_interface_types(packed), tokens);
    }

    /// Comma-joined address lists of plain tokens split and rejoin without
    /// loss through a full compile/decompile cycle.
    #[test]
    fn prop_address_lists_round_trip(
        addresses in proptest::collection::vec("[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}", 1..5)
    ) {
        let mut element = exception(&[("Name", "prop"), ("Port", "443")]);
        for address in &addresses {
            element.children.push(
                Element::new(NAMESPACE, "RemoteAddress").with_attribute("Value", address.as_str()),
            );
        }

        let context = component_context();
        let first = compile(&context, &element);
        prop_assert_eq!(&first.remote_addresses, &addresses.join(","));

        let reconstructed = decompile(&first);
        let second = compile(&context, &reconstructed);
        prop_assert_eq!(second, first);
    }
}
