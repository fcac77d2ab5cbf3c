//! Configuration store using the actor pattern.
//!
//! The store mirrors one JSON document: an actor task owns the
//! in-memory copy and the file, commands arrive over an mpsc channel,
//! and every successful mutation rewrites the whole file atomically.
//! Readers get consistent snapshots; writers apply in submission order
//! with no overlap (the actor processes one command at a time).
//!
//! ```text
//! ┌──────────────┐   ConfigCommand    ┌──────────────────────┐
//! │ ConfigHandle │───(mpsc channel)──▶│     ConfigActor      │
//! │ (any task)   │◀──(oneshot reply)──│ owns ConfigDocument  │
//! └──────────────┘                    │ + atomic file writes │
//!                                     └──────────────────────┘
//! ```

use std::path::PathBuf;

use tokio::sync::mpsc;

mod actor;
mod commands;
mod handle;

pub use actor::ConfigActor;
pub use commands::{ConfigCommand, StoreError};
pub use handle::ConfigHandle;

/// Command channel depth; mutations are small and drain quickly.
const COMMAND_BUFFER: usize = 64;

/// Spawns the config store actor for the document at `path` and
/// returns a handle for interaction.
///
/// The actor starts with an empty in-memory document; call
/// [`ConfigHandle::load`] before reading.
pub fn spawn_config_store(path: PathBuf) -> ConfigHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = ConfigActor::new(cmd_rx, path);
    tokio::spawn(actor.run());

    ConfigHandle::new(cmd_tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_spawned_store_lifecycle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            serde_json::to_vec(&json!({ "delay_counter": 2, "vendor": "acme" })).unwrap(),
        )
        .unwrap();

        let handle = spawn_config_store(path.clone());
        handle.load().await.unwrap();

        assert_eq!(handle.delay_counter().await.unwrap(), 2);

        handle.apply_delay(1800).await.unwrap();
        handle.apply_delay(1800).await.unwrap();
        handle.apply_delay(1800).await.unwrap();
        assert_eq!(handle.delay_counter().await.unwrap(), 0);

        // Unknown key survives the whole sequence, in memory and on disk.
        let doc = handle.document().await.unwrap();
        assert_eq!(doc.get("vendor"), Some(&json!("acme")));
        let on_disk: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk["vendor"], "acme");
    }

    #[tokio::test]
    async fn test_mutations_apply_in_submission_order() {
        let dir = TempDir::new().unwrap();
        let handle = spawn_config_store(dir.path().join("config.json"));
        handle.load().await.unwrap();

        // reboot_now raised, then cleared by the delay - final state
        // must reflect the submission order.
        handle.set_reboot_now().await.unwrap();
        handle.apply_delay(600).await.unwrap();

        let doc = handle.document().await.unwrap();
        assert!(!doc.reboot_now());
    }
}
