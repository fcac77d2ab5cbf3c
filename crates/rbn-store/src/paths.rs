//! State-file path resolution.
//!
//! Probes a priority list of candidate directories for write access and
//! hands the rest of the system three absolute file paths. Consumers
//! treat this purely as "give me a writable path"; there is no retry if
//! a candidate stops being writable later.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use tracing::{debug, warn};

/// Environment override for the state directory.
pub const ENV_STATE_DIR: &str = "RBN_STATE_DIR";

/// Directory name used under the standard locations.
const APP_DIR_NAME: &str = "rbn";

/// Last-resort directory when no candidate is writable.
const FALLBACK_DIR: &str = "/tmp/rbn";

/// File names inside the resolved state directory.
const CONFIG_FILE: &str = "config.json";
const SNAPSHOT_FILE: &str = "last_action.json";
const HISTORY_FILE: &str = "history.log";

/// Resolved locations of the agent's three state files.
///
/// The directory is guaranteed to exist by the time this is handed out
/// (except for the last-resort fallback, where creation is best effort).
#[derive(Debug, Clone)]
pub struct StatePaths {
    dir: PathBuf,
}

impl StatePaths {
    /// Resolves the state directory from the candidate list.
    ///
    /// Order: `RBN_STATE_DIR` override, the user state directory, the
    /// system temp directory, the user data directory. The first
    /// candidate that can be created and written wins; if none can,
    /// falls back to `/tmp/rbn` without further probing.
    pub fn resolve() -> Self {
        for candidate in candidates() {
            if ensure_writable(&candidate) {
                debug!(dir = %candidate.display(), "state directory resolved");
                return Self { dir: candidate };
            }
        }

        let fallback = PathBuf::from(FALLBACK_DIR);
        warn!(
            dir = %fallback.display(),
            "no writable state directory candidate; using last resort"
        );
        let _ = fs::create_dir_all(&fallback);
        Self { dir: fallback }
    }

    /// Uses a fixed directory, creating it if needed. Test seam.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let _ = fs::create_dir_all(&dir);
        Self { dir }
    }

    /// The resolved state directory itself.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The configuration document file.
    pub fn config_file(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    /// The latest-action snapshot file.
    pub fn snapshot_file(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    /// The append-only history file.
    pub fn history_file(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }
}

/// Candidate directories in priority order.
fn candidates() -> Vec<PathBuf> {
    let mut list = Vec::new();

    if let Ok(override_dir) = env::var(ENV_STATE_DIR) {
        if !override_dir.trim().is_empty() {
            list.push(PathBuf::from(override_dir));
        }
    }

    if let Some(state) = dirs::state_dir() {
        list.push(state.join(APP_DIR_NAME));
    }

    list.push(env::temp_dir().join(APP_DIR_NAME));

    if let Some(data) = dirs::data_dir() {
        list.push(data.join(APP_DIR_NAME));
    }

    list
}

/// True when the directory exists (or could be created) and a probe
/// file can actually be written and removed in it.
fn ensure_writable(dir: &Path) -> bool {
    if fs::create_dir_all(dir).is_err() {
        return false;
    }

    let probe = dir.join(format!(".probe.{}", process::id()));
    match fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "candidate not writable");
            false
        }
    }
}
