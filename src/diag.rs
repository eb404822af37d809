//! Structured diagnostics for the compile and decompile passes
//!
//! Validation failures never abort a run. The compiler records every problem
//! it finds on an element and keeps going, so one malformed element can
//! report several diagnostics in a single pass; the decompiler downgrades
//! unresolved cross-references to warnings. The surrounding toolchain decides
//! whether a run with errors is a failed build.

use std::fmt;
use thiserror::Error;

/// Diagnostic severity. Errors suppress row creation for the offending
/// element; warnings do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Severity {
    #[strum(serialize = "warning")]
    Warning,
    #[strum(serialize = "error")]
    Error,
}

/// Every diagnostic the mapping engine can produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    #[error("the {element} element contains an unexpected attribute '{attribute}'")]
    UnexpectedAttribute { element: String, attribute: String },

    #[error("the {parent} element contains an unexpected child element '{child}'")]
    UnexpectedElement { parent: String, child: String },

    #[error(
        "the {element}/@{attribute} attribute cannot be specified when the element is nested under a {parent} element"
    )]
    IllegalAttributeWhenNested {
        element: String,
        attribute: String,
        parent: String,
    },

    #[error(
        "the {element}/@{attribute} attribute's value '{value}' is not one of the legal values: {legal}"
    )]
    IllegalAttributeValue {
        element: String,
        attribute: String,
        value: String,
        legal: String,
    },

    #[error("the {element}/@{attribute} attribute's value '{value}' is not a legal yes/no value")]
    IllegalYesNoValue {
        element: String,
        attribute: String,
        value: String,
    },

    #[error("the {element}/@{attribute} attribute's value '{value}' is not a legal identifier")]
    IllegalIdentifier {
        element: String,
        attribute: String,
        value: String,
    },

    #[error(
        "the {element}/@{attribute} attribute's value '{value}' must be an integer between {min} and {max}"
    )]
    IntegerOutOfRange {
        element: String,
        attribute: String,
        value: String,
        min: i64,
        max: i64,
    },

    #[error("the {element} element must have a value for the {attribute} attribute")]
    ExpectedAttribute { element: String, attribute: String },

    #[error("the {element}/@{attribute} attribute's value cannot be an empty string")]
    IllegalEmptyAttributeValue { element: String, attribute: String },

    #[error(
        "the {element} element must have either a {attribute} attribute or at least one {child} child element"
    )]
    ExpectedAttributeOrElement {
        element: String,
        attribute: String,
        child: String,
    },

    #[error(
        "the {element}/@{attribute} attribute cannot be specified together with the {other} attribute"
    )]
    IllegalAttributeWithOtherAttribute {
        element: String,
        attribute: String,
        other: String,
    },

    #[error(
        "the FirewallException element must be nested under a File element, or must specify a File, Program, or Port attribute"
    )]
    NoExceptionSpecified,

    #[error(
        "RemoteAddress elements cannot be specified when the FirewallException element has a Scope attribute"
    )]
    IllegalRemoteAddressWithScope,

    #[error("the identifier '{id}' is already defined in this compilation unit")]
    DuplicateId { id: String },

    #[error(
        "the {table} table contains row '{key}' which references the {target} '{target_id}' that does not exist"
    )]
    ExpectedForeignRow {
        table: String,
        key: String,
        target: String,
        target_id: String,
    },
}

/// A reported problem: a kind plus its severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind) -> Self {
        Self {
            severity: Severity::Error,
            kind,
        }
    }

    pub fn warning(kind: DiagnosticKind) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.kind)
    }
}

/// Append-only diagnostic store shared by one compile or decompile run.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, kind: DiagnosticKind) {
        tracing::error!(%kind, "validation error");
        self.error_count += 1;
        self.diagnostics.push(Diagnostic::error(kind));
    }

    pub fn warning(&mut self, kind: DiagnosticKind) {
        tracing::warn!(%kind, "validation warning");
        self.diagnostics.push(Diagnostic::warning(kind));
    }

    /// Number of error-severity diagnostics so far. The compiler snapshots
    /// this before parsing an element to decide whether that element may
    /// still produce a row.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}
