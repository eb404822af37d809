//! Core data model shared by the compiler and decompiler
//!
//! - [`codec`]: two-way token ⇄ packed-integer mappings for enums and bitfields
//! - [`record`]: the normalized exception record and its persisted row shape
//! - [`error`]: error types for structurally unusable decompiler input

pub mod codec;
pub mod error;
pub mod record;
