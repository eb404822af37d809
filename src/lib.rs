//! fwext - Firewall Exception Extension
//!
//! An extension for the declarative installer toolchain that compiles a
//! namespace-scoped XML vocabulary describing Windows Firewall exception
//! rules into normalized installer-database rows, and decompiles stored rows
//! back into the vocabulary.
//!
//! # Architecture
//!
//! - [`core`] - Shared data model: bitfield/enum codec, exception records,
//!   the persisted row shape
//! - [`compiler`] - `FirewallException` element to validated record, with
//!   identifier synthesis and cross-reference registration
//! - [`decompiler`] - Stored rows back to elements, re-attached under their
//!   owning components
//! - [`diag`] - Accumulating structured diagnostics
//! - [`validators`] - Attribute value validation and coercion
//! - [`xml`] - Minimal element model bridging the host's XML infrastructure
//!
//! Both pipelines are single-threaded and synchronous; a compilation or
//! decompilation unit is owned exclusively for the length of its run.
//!
//! # Round trip
//!
//! Compiling an element, decompiling the resulting row, and compiling the
//! decompiled element again yields a field-for-field identical record.
//! Defaults are exact inverses: attributes left off the element compile to
//! the default packed values, and default packed values decompile to no
//! attribute.

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]

pub mod compiler;
pub mod core;
pub mod decompiler;
pub mod diag;
pub mod validators;
pub mod xml;

// Re-export commonly used types
pub use compiler::{Compiler, NAMESPACE, ParentContext, Platform, Reference, Section};
pub use crate::core::codec::{Direction, ExceptionFlags, InterfaceType, Profile, Protocol};
pub use crate::core::error::{Error, Result};
pub use crate::core::record::{EXCEPTION_TABLE, FirewallExceptionRecord, Row, Table};
pub use decompiler::{Decompiler, ElementIndex};
pub use diag::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity};
pub use xml::{Attribute, Element, XName};
