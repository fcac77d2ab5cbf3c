//! Reboot notice agent binary.
//!
//! See [`rbnd::cli`] for the command-line surface.

use anyhow::Result;

fn main() -> Result<()> {
    rbnd::cli::run()
}
