//! Domain layer for codeindex: core types, ports (trait boundaries for external
//! collaborators), the error taxonomy, and shared constants.
//!
//! This crate has no I/O and no async runtime dependency of its own beyond the
//! trait signatures in [`ports`]; concrete implementations live in
//! `codeindex-infrastructure` and `codeindex-providers`.

pub mod constants;
pub mod entities;
pub mod error;
pub mod ports;
pub mod value_objects;
