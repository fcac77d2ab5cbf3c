//! RBN Store - Durable state for the reboot notice agent
//!
//! This crate provides the persistence layer:
//! - `atomic` - all-or-nothing file replacement
//! - `paths` - writable state-directory resolution
//! - `config` - the configuration document store (actor-owned)
//! - `journal` - append-only action history plus latest-action snapshot
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                     rbn-store                          │
//! ├───────────────────────────────────────────────────────┤
//! │  ┌──────────────┐          ┌──────────────────┐       │
//! │  │ ConfigActor  │          │  JournalWorker   │       │
//! │  │ config.json  │          │  history.log     │       │
//! │  └──────┬───────┘          │  last_action.json│       │
//! │         │                  └────────┬─────────┘       │
//! │         └───────────┬───────────────┘                 │
//! │                     ▼                                 │
//! │              write_atomic()                           │
//! │        (temp file + fsync + rename)                   │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! no `.unwrap()` or `.expect()` outside tests; disk failures degrade
//! to logged warnings and in-memory state stays authoritative.

pub mod atomic;
pub mod config;
pub mod journal;
pub mod paths;

pub use atomic::{write_atomic, WriteError};
pub use config::{spawn_config_store, ConfigHandle, StoreError};
pub use journal::{spawn_journal, ActionJournal};
pub use paths::StatePaths;
