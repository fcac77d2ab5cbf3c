//! RBN Core - Domain types for the reboot notice agent
//!
//! This crate provides the pure in-memory domain model shared between
//! the persistence layer (rbn-store) and the daemon (rbnd):
//! the countdown state machine, the schema-flexible configuration
//! document, the audit action record, and the reboot policy mode.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()` in production paths.

pub mod action;
pub mod countdown;
pub mod document;
pub mod policy;

// Re-exports for convenience
pub use action::{ActionKind, LoggedAction};
pub use countdown::CountdownState;
pub use document::{ConfigDocument, DEFAULT_NOTICE_MESSAGE};
pub use policy::RebootPolicy;
