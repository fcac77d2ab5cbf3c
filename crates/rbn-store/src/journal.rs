//! Action journal - append-only history plus a latest-action snapshot.
//!
//! One worker task owns both files. `record` returns to the caller
//! immediately; the worker applies entries strictly in the order the
//! calls were issued, appending one JSON line to the history file and
//! atomically overwriting the snapshot file with the newest entry. The
//! append itself is plain open-seek-write: a crash mid-append may
//! truncate the final line but can never corrupt prior lines.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Disk failures are logged warnings; the journal never stops the agent

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use rbn_core::{ActionKind, LoggedAction};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::atomic::write_atomic;

/// Permissions for the snapshot file.
const SNAPSHOT_FILE_MODE: u32 = 0o644;

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug)]
enum JournalCommand {
    /// Append to history and overwrite the snapshot.
    Record { entry: LoggedAction },

    /// Reset the snapshot file to an empty object (startup only, so a
    /// prior run's snapshot is never shown as current).
    Clear { respond_to: oneshot::Sender<()> },

    /// Barrier: resolves once all previously submitted work is on disk.
    Sync { respond_to: oneshot::Sender<()> },
}

// ============================================================================
// Handle
// ============================================================================

/// Handle for submitting journal work.
///
/// Cheap to clone. `record` is fire-and-forget: it never blocks and
/// never fails visibly; ordering is guaranteed by the single worker.
#[derive(Clone)]
pub struct ActionJournal {
    sender: mpsc::UnboundedSender<JournalCommand>,
}

impl ActionJournal {
    /// Records one action with the countdown snapshot taken now.
    ///
    /// Returns immediately; the entry is applied after all previously
    /// submitted entries, in order.
    pub fn record(&self, action: ActionKind, remaining_seconds: u64) {
        let entry = LoggedAction::now(action, remaining_seconds);
        if self.sender.send(JournalCommand::Record { entry }).is_err() {
            warn!(%action, "action journal worker gone; entry dropped");
        }
    }

    /// Resets the snapshot file to `{}`.
    ///
    /// Resolves once the reset has been applied (and everything queued
    /// before it).
    pub async fn clear(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(JournalCommand::Clear { respond_to: tx })
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    /// Waits until every previously submitted entry has hit disk.
    ///
    /// Used at shutdown so the final action is durably journaled before
    /// the process exits.
    pub async fn sync(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(JournalCommand::Sync { respond_to: tx })
            .is_ok()
        {
            let _ = rx.await;
        }
    }
}

// ============================================================================
// Worker
// ============================================================================

struct JournalWorker {
    receiver: mpsc::UnboundedReceiver<JournalCommand>,
    history_path: PathBuf,
    snapshot_path: PathBuf,
}

impl JournalWorker {
    async fn run(mut self) {
        debug!(
            history = %self.history_path.display(),
            snapshot = %self.snapshot_path.display(),
            "action journal starting"
        );

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                JournalCommand::Record { entry } => self.apply_record(entry).await,
                JournalCommand::Clear { respond_to } => {
                    self.apply_clear().await;
                    let _ = respond_to.send(());
                }
                JournalCommand::Sync { respond_to } => {
                    // The worker applies commands one at a time, so
                    // answering means everything queued earlier is done.
                    let _ = respond_to.send(());
                }
            }
        }

        debug!("action journal stopped");
    }

    async fn apply_record(&self, entry: LoggedAction) {
        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "action entry serialization failed; entry dropped");
                return;
            }
        };

        let history = self.history_path.clone();
        let snapshot = self.snapshot_path.clone();
        let snapshot_bytes = line.clone().into_bytes();

        let result = tokio::task::spawn_blocking(move || {
            append_line(&history, &line)?;
            write_atomic(&snapshot_bytes, &snapshot, Some(SNAPSHOT_FILE_MODE))
                .map_err(|e| std::io::Error::other(e.to_string()))
        })
        .await;

        match result {
            Ok(Ok(())) => {
                debug!(action = %entry.action, remaining = entry.remaining_seconds, "action journaled");
            }
            Ok(Err(e)) => {
                warn!(error = %e, "action journal write failed; continuing");
            }
            Err(e) => {
                warn!(error = %e, "action journal task failed");
            }
        }
    }

    async fn apply_clear(&self) {
        let snapshot = self.snapshot_path.clone();
        let result = tokio::task::spawn_blocking(move || {
            write_atomic(b"{}", &snapshot, Some(SNAPSHOT_FILE_MODE))
        })
        .await;

        match result {
            Ok(Ok(())) => debug!("action snapshot cleared"),
            Ok(Err(e)) => warn!(error = %e, "action snapshot clear failed"),
            Err(e) => warn!(error = %e, "action snapshot clear task failed"),
        }
    }
}

/// Open-or-create, seek-to-end, write one newline-terminated line.
fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

/// Spawns the journal worker and returns its handle.
pub fn spawn_journal(history_path: PathBuf, snapshot_path: PathBuf) -> ActionJournal {
    let (tx, rx) = mpsc::unbounded_channel();

    let worker = JournalWorker {
        receiver: rx,
        history_path,
        snapshot_path,
    };
    tokio::spawn(worker.run());

    ActionJournal { sender: tx }
}
