//! Config store commands and errors.
//!
//! Message types for the `ConfigActor`: commands arrive over an mpsc
//! channel and answer through oneshot channels, so callers can await a
//! mutation's persistence without the actor ever blocking on a caller.

use rbn_core::ConfigDocument;
use thiserror::Error;
use tokio::sync::oneshot;

/// Commands sent to the config store actor.
///
/// Mutations respond only after the in-memory document has been updated
/// and the persist attempt has finished (success or logged warning), so
/// an awaited mutation is durably mirrored - or at least attempted -
/// before control returns.
#[derive(Debug)]
pub enum ConfigCommand {
    /// Read the document file from disk, replacing in-memory state.
    ///
    /// Absent, empty, or malformed files are never fatal: the store
    /// starts from an empty document and persists it. Legacy keys are
    /// normalized away as part of the load.
    Load {
        /// Channel to signal completion
        respond_to: oneshot::Sender<()>,
    },

    /// Snapshot of the full current document.
    Document {
        /// Channel to send the snapshot
        respond_to: oneshot::Sender<ConfigDocument>,
    },

    /// Current deferral credit.
    DelayCounter {
        /// Channel to send the counter value
        respond_to: oneshot::Sender<u64>,
    },

    /// Raise the immediate-reboot flag.
    SetRebootNow {
        /// Channel to signal completion
        respond_to: oneshot::Sender<()>,
    },

    /// Clear scheduled-reboot bookkeeping.
    ClearScheduledStatus {
        /// Channel to signal completion
        respond_to: oneshot::Sender<()>,
    },

    /// Record a deferral: decrement credit (floor 0), compute the new
    /// scheduled time, clear the task and reboot flags.
    ApplyDelay {
        /// Delay length in seconds
        seconds: u64,
        /// Channel to signal completion
        respond_to: oneshot::Sender<()>,
    },
}

/// Errors that can occur when talking to the config store.
///
/// The store itself has no failing operations - load recovers, persist
/// degrades to a warning - so the only error a caller can see is the
/// actor being gone.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The actor has shut down and the channel is closed.
    #[error("config store channel closed")]
    ChannelClosed,
}
