//! RBN Daemon - Reboot notice agent
//!
//! This crate wires the domain model and the persistence layer into the
//! running agent:
//! - `coordinator` - owns the countdown, drives the tick, decides expiry
//! - `cli` - command-line surface, pid file, signals, daemonization
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         rbnd agent                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │   1 s tick ──▶ ┌──────────────┐  delay_counter  ┌──────────┐ │
//! │   SIGUSR1  ──▶ │ Coordinator  │◀───────────────▶│ConfigStore│ │
//! │                │ (countdown)  │   apply_delay   └──────────┘ │
//! │                └──────┬───────┘                              │
//! │                       │ record                               │
//! │                       ▼                                      │
//! │                ┌──────────────┐                              │
//! │                │ActionJournal │  history.log + last_action   │
//! │                └──────────────┘                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! no `.unwrap()` or `.expect()` outside tests; disk problems never
//! block the countdown or the reboot decision.

pub mod cli;
pub mod coordinator;
