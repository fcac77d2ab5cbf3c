//! Client interface for the config store actor.
//!
//! `ConfigHandle` is a cheap-to-clone handle whose methods send
//! commands over the actor's mpsc channel and await the oneshot
//! response. Awaiting a mutation means the in-memory change has been
//! applied and its persist attempt has completed.

use rbn_core::ConfigDocument;
use tokio::sync::{mpsc, oneshot};

use super::commands::{ConfigCommand, StoreError};

/// Handle for interacting with the config store.
///
/// Clone freely; all clones talk to the same actor.
#[derive(Clone)]
pub struct ConfigHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<ConfigCommand>,
}

impl ConfigHandle {
    /// Creates a new handle around the command channel.
    pub fn new(sender: mpsc::Sender<ConfigCommand>) -> Self {
        Self { sender }
    }

    /// Loads the document from disk, replacing in-memory state.
    ///
    /// Never fails on file problems (first run is normal); only errors
    /// if the actor itself is gone.
    ///
    /// # Errors
    ///
    /// - `StoreError::ChannelClosed` if the actor has shut down
    pub async fn load(&self) -> Result<(), StoreError> {
        self.roundtrip(|tx| ConfigCommand::Load { respond_to: tx })
            .await
    }

    /// Re-runs the load, discarding unpersisted in-memory state.
    ///
    /// Process-start only; mid-run use would throw away mutations the
    /// document has already answered for.
    pub async fn reload(&self) -> Result<(), StoreError> {
        self.load().await
    }

    /// Snapshot of the full current document.
    pub async fn document(&self) -> Result<ConfigDocument, StoreError> {
        self.roundtrip(|tx| ConfigCommand::Document { respond_to: tx })
            .await
    }

    /// Current deferral credit.
    pub async fn delay_counter(&self) -> Result<u64, StoreError> {
        self.roundtrip(|tx| ConfigCommand::DelayCounter { respond_to: tx })
            .await
    }

    /// Raises the immediate-reboot flag and persists.
    pub async fn set_reboot_now(&self) -> Result<(), StoreError> {
        self.roundtrip(|tx| ConfigCommand::SetRebootNow { respond_to: tx })
            .await
    }

    /// Clears scheduled-reboot bookkeeping and persists.
    pub async fn clear_scheduled_status(&self) -> Result<(), StoreError> {
        self.roundtrip(|tx| ConfigCommand::ClearScheduledStatus { respond_to: tx })
            .await
    }

    /// Records a deferral of `seconds` and persists.
    ///
    /// Decrements the credit counter independently of the countdown
    /// state machine; callers check the state machine's admission first.
    pub async fn apply_delay(&self, seconds: u64) -> Result<(), StoreError> {
        self.roundtrip(|tx| ConfigCommand::ApplyDelay {
            seconds,
            respond_to: tx,
        })
        .await
    }

    /// Check if the actor is still running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Sends one command and awaits its oneshot answer.
    async fn roundtrip<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ConfigCommand,
    ) -> Result<T, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| StoreError::ChannelClosed)?;
        rx.await.map_err(|_| StoreError::ChannelClosed)
    }
}
