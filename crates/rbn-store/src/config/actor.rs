//! Config store actor - owns the configuration document.
//!
//! The actor is the single owner of the in-memory `ConfigDocument` and
//! of the document file on disk. It processes commands sequentially, so
//! no reader ever observes a document mid-mutation and mutations apply
//! strictly in submission order.
//!
//! The in-memory document is authoritative: a failed persist is logged
//! and the mutation stands. Disk is a best-effort mirror until the next
//! successful persist or process restart.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel send failures are ignored (client may have dropped)
//! - Filesystem failures degrade to logged warnings, never aborts

use std::path::{Path, PathBuf};

use chrono::Local;
use rbn_core::ConfigDocument;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::atomic::write_atomic;
use super::commands::ConfigCommand;

/// Permissions for the persisted document file.
const CONFIG_FILE_MODE: u32 = 0o644;

/// The config store actor.
///
/// # Ownership
///
/// The actor owns the document and the path; everything else talks to
/// it through [`super::ConfigHandle`].
pub struct ConfigActor {
    /// Command receiver
    receiver: mpsc::Receiver<ConfigCommand>,

    /// Location of the persisted JSON document
    path: PathBuf,

    /// The authoritative in-memory document
    document: ConfigDocument,
}

impl ConfigActor {
    /// Creates a new actor for the document at `path`.
    ///
    /// The document starts empty; callers issue `Load` before relying
    /// on the contents.
    pub fn new(receiver: mpsc::Receiver<ConfigCommand>, path: PathBuf) -> Self {
        Self {
            receiver,
            path,
            document: ConfigDocument::empty(),
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all senders dropped).
    pub async fn run(mut self) {
        debug!(path = %self.path.display(), "config store starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        debug!("config store stopped");
    }

    /// Dispatches a command to the appropriate handler.
    async fn handle_command(&mut self, cmd: ConfigCommand) {
        match cmd {
            ConfigCommand::Load { respond_to } => {
                self.handle_load().await;
                // Ignore send error - client may have dropped the receiver
                let _ = respond_to.send(());
            }
            ConfigCommand::Document { respond_to } => {
                let _ = respond_to.send(self.document.clone());
            }
            ConfigCommand::DelayCounter { respond_to } => {
                let _ = respond_to.send(self.document.delay_counter());
            }
            ConfigCommand::SetRebootNow { respond_to } => {
                self.document.set_reboot_now();
                self.persist().await;
                let _ = respond_to.send(());
            }
            ConfigCommand::ClearScheduledStatus { respond_to } => {
                self.document.clear_scheduled_status();
                self.persist().await;
                let _ = respond_to.send(());
            }
            ConfigCommand::ApplyDelay {
                seconds,
                respond_to,
            } => {
                self.document.apply_delay(seconds, Local::now());
                info!(
                    seconds,
                    delay_counter = self.document.delay_counter(),
                    scheduled_time = self.document.scheduled_time(),
                    "delay recorded in config"
                );
                self.persist().await;
                let _ = respond_to.send(());
            }
        }
    }

    // ========================================================================
    // Load / Persist
    // ========================================================================

    /// Reads the document from disk, normalizes legacy keys, and
    /// persists the normalized result so legacy keys never survive a
    /// load on disk either.
    async fn handle_load(&mut self) {
        let path = self.path.clone();
        let loaded = tokio::task::spawn_blocking(move || read_document(&path))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "config load task failed; starting from empty document");
                ConfigDocument::empty()
            });

        self.document = loaded;

        let removed = self.document.normalize_legacy_keys();
        if removed > 0 {
            debug!(removed, "legacy config keys normalized");
        }

        self.persist().await;
    }

    /// Serializes the full document and writes it atomically.
    ///
    /// Failures are reported but the in-memory mutation stands.
    async fn persist(&self) {
        let bytes = match self.document.to_pretty_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "config serialization failed; skipping persist");
                return;
            }
        };

        let path = self.path.clone();
        let result =
            tokio::task::spawn_blocking(move || write_atomic(&bytes, &path, Some(CONFIG_FILE_MODE)))
                .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "config persist failed; in-memory document remains authoritative"
                );
            }
            Err(e) => {
                warn!(error = %e, "config persist task failed");
            }
        }
    }

    // ========================================================================
    // Accessors (for testing)
    // ========================================================================

    /// Returns the current in-memory document.
    #[cfg(test)]
    fn document(&self) -> &ConfigDocument {
        &self.document
    }
}

/// Reads and parses the document file.
///
/// First run (no file), an empty file, or malformed/non-object JSON all
/// recover to an empty document; only the malformed cases warrant a
/// warning.
fn read_document(path: &Path) -> ConfigDocument {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no config file yet; starting from empty document");
            return ConfigDocument::empty();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config file unreadable; starting from empty document");
            return ConfigDocument::empty();
        }
    };

    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return ConfigDocument::empty();
    }

    match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(value) => ConfigDocument::from_value(value).unwrap_or_else(|| {
            warn!(path = %path.display(), "config file is not a JSON object; discarding");
            ConfigDocument::empty()
        }),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config file is malformed JSON; discarding");
            ConfigDocument::empty()
        }
    }
}
