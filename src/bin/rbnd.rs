//! Reboot notice agent binary (workspace-root shim).
//!
//! See [`rbnd::cli`] for the command-line surface.

use anyhow::Result;

fn main() -> Result<()> {
    rbnd::cli::run()
}
