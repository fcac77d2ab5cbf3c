//! Command-line entry point for the reboot notice daemon.
//!
//! ```bash
//! # Start the agent (foreground), 10 minute countdown
//! rbnd start --countdown 600
//!
//! # Start in the background with custom delay options
//! rbnd start -d --delays 1800,3600,14400
//!
//! # Stop the running agent
//! rbnd stop
//!
//! # Check agent status
//! rbnd status
//!
//! # Relocate state files
//! RBN_STATE_DIR=/var/lib/rbn rbnd start
//!
//! # Enable debug logging
//! RUST_LOG=rbnd=debug rbnd start
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: graceful shutdown at the next tick boundary
//! - SIGUSR1: request the smallest configured delay (stand-in for the
//!   notice panel's defer button)

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rbn_core::CountdownState;
use rbn_store::{spawn_config_store, spawn_journal, StatePaths};

use crate::coordinator::{Coordinator, ExpiryOutcome};

/// Default countdown length in seconds (10 minutes).
pub const DEFAULT_COUNTDOWN_SECS: u64 = 600;

/// Default delay options in seconds (30 min, 1 h, 4 h).
const DEFAULT_DELAYS: &str = "1800,3600,14400";

/// Reboot notice agent - countdown and deferral bookkeeping
#[derive(Parser, Debug)]
#[command(name = "rbnd", version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the agent
    Start {
        /// Run as a background daemon (fork to background)
        #[arg(short = 'd', long)]
        daemon: bool,

        /// Countdown length in seconds before the reboot decision
        #[arg(long, default_value_t = DEFAULT_COUNTDOWN_SECS)]
        countdown: u64,

        /// Delay options in seconds the operator may pick
        #[arg(long, value_delimiter = ',', default_value = DEFAULT_DELAYS)]
        delays: Vec<u64>,

        /// Cap on total accumulated delay in seconds (accepted, not
        /// currently enforced)
        #[arg(long)]
        max_total_delay: Option<u64>,
    },
    /// Stop the running agent
    Stop,
    /// Show agent status
    Status,
}

/// Runs the CLI. This is the whole binary.
pub fn run() -> Result<()> {
    let args = Args::parse();

    // Default to 'start' if no subcommand given
    let command = args.command.unwrap_or(Command::Start {
        daemon: false,
        countdown: DEFAULT_COUNTDOWN_SECS,
        delays: parse_default_delays(),
        max_total_delay: None,
    });

    match command {
        Command::Start {
            daemon,
            countdown,
            delays,
            max_total_delay,
        } => {
            if let Some(pid) = running_agent_pid() {
                eprintln!("Agent is already running (PID {})", pid);
                eprintln!("Use 'rbnd stop' to stop it first.");
                process::exit(1);
            }

            if daemon {
                // Daemonize before starting the tokio runtime
                daemonize()?;
            }

            write_pid()?;
            let result = run_agent(countdown, delays, max_total_delay);
            remove_pid_file();
            result
        }
        Command::Stop => {
            if let Some(pid) = running_agent_pid() {
                println!("Stopping agent (PID {})...", pid);
                stop_agent(pid)?;

                // Wait for the process to exit (up to 5 seconds)
                for _ in 0..50 {
                    if !is_process_running(pid) {
                        println!("Agent stopped.");
                        return Ok(());
                    }
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }

                eprintln!("Agent did not stop within 5 seconds.");
                process::exit(1);
            } else {
                println!("Agent is not running.");
                Ok(())
            }
        }
        Command::Status => {
            if let Some(pid) = running_agent_pid() {
                println!("Agent is running (PID {})", pid);
                println!("State directory: {}", StatePaths::resolve().dir().display());
                Ok(())
            } else {
                println!("Agent is not running.");
                process::exit(1);
            }
        }
    }
}

fn parse_default_delays() -> Vec<u64> {
    DEFAULT_DELAYS
        .split(',')
        .filter_map(|s| s.parse().ok())
        .collect()
}

// ============================================================================
// PID File Management
// ============================================================================

/// Returns the path to the PID file.
fn pid_file_path() -> PathBuf {
    StatePaths::resolve().dir().join("rbnd.pid")
}

/// Returns the path to the daemonized-mode log file.
fn log_file_path() -> PathBuf {
    StatePaths::resolve().dir().join("rbnd.log")
}

/// Reads the PID from the PID file, if it exists.
fn read_pid() -> Option<u32> {
    let path = pid_file_path();
    let mut file = File::open(&path).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

/// Writes the current PID to the PID file.
fn write_pid() -> Result<()> {
    let path = pid_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create state directory")?;
    }
    let mut file = File::create(&path).context("Failed to create PID file")?;
    write!(file, "{}", process::id()).context("Failed to write PID")?;
    Ok(())
}

/// Removes the PID file.
fn remove_pid_file() {
    let path = pid_file_path();
    let _ = fs::remove_file(path);
}

/// Checks if a process with the given PID is running.
fn is_process_running(pid: u32) -> bool {
    PathBuf::from(format!("/proc/{}", pid)).exists()
}

/// Checks if the agent is already running.
fn running_agent_pid() -> Option<u32> {
    if let Some(pid) = read_pid() {
        if is_process_running(pid) {
            return Some(pid);
        }
        // Stale PID file - remove it
        remove_pid_file();
    }
    None
}

/// Sends SIGTERM to the agent process.
fn stop_agent(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let result = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
        if result != 0 {
            bail!("Failed to send SIGTERM to process {}", pid);
        }
    }
    #[cfg(not(unix))]
    {
        bail!("Stop command is only supported on Unix systems");
    }
    Ok(())
}

/// Daemonizes the current process.
fn daemonize() -> Result<()> {
    use daemonize::Daemonize;

    let log_path = log_file_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    let stdout = File::create(&log_path).context("Failed to create log file for stdout")?;
    let stderr = File::create(&log_path).context("Failed to create log file for stderr")?;

    let daemonize = Daemonize::new()
        .working_directory("/")
        .stdout(stdout)
        .stderr(stderr);

    daemonize.start().context("Failed to daemonize")?;

    Ok(())
}

// ============================================================================
// Agent Runtime
// ============================================================================

/// Runs the agent (async entry point).
#[tokio::main]
async fn run_agent(
    countdown_secs: u64,
    delays: Vec<u64>,
    max_total_delay: Option<u64>,
) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("rbnd=info".parse()?)
                .add_directive("rbn_store=info".parse()?)
                .add_directive("rbn_core=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        countdown_secs,
        "reboot notice agent starting"
    );

    let paths = StatePaths::resolve();
    info!(dir = %paths.dir().display(), "state directory");

    // Configuration store: load, then drop any schedule a prior run
    // left behind - this notice supersedes it.
    let config = spawn_config_store(paths.config_file());
    config
        .load()
        .await
        .map_err(|e| anyhow::anyhow!("config store died during load: {e}"))?;
    if let Err(e) = config.clear_scheduled_status().await {
        warn!(error = %e, "could not clear prior scheduled status");
    }

    let document = config
        .document()
        .await
        .map_err(|e| anyhow::anyhow!("config store died: {e}"))?;
    info!(
        message = document.custom_message(),
        policy = %document.reboot_policy(),
        delay_counter = document.delay_counter(),
        "notice configuration"
    );

    // Action journal: clear the stale snapshot, then mark startup.
    let journal = spawn_journal(paths.history_file(), paths.snapshot_file());
    journal.clear().await;
    journal.record(rbn_core::ActionKind::AgentStarted, countdown_secs);

    let countdown = CountdownState::new(countdown_secs, delays, max_total_delay);
    let coordinator = Coordinator::new(countdown, config, journal.clone());

    // Graceful shutdown plus the deferral signal.
    let cancel_token = CancellationToken::new();
    let (delay_tx, delay_rx) = mpsc::channel(8);
    spawn_signal_tasks(
        cancel_token.clone(),
        delay_tx,
        coordinator.smallest_delay_option(),
    );

    match coordinator.run(cancel_token, delay_rx).await {
        Some(ExpiryOutcome::Delayed(seconds)) => {
            info!(seconds, "exiting: reboot deferred automatically");
        }
        Some(ExpiryOutcome::RebootNow) => {
            info!("exiting: immediate reboot flagged");
        }
        None => {
            info!("exiting: shutdown requested");
        }
    }

    journal.sync().await;
    info!("reboot notice agent stopped");
    Ok(())
}

/// Spawns the signal listeners: SIGTERM/SIGINT cancel the countdown,
/// SIGUSR1 requests the smallest configured delay.
fn spawn_signal_tasks(
    cancel_token: CancellationToken,
    delay_tx: mpsc::Sender<u64>,
    smallest_delay: Option<u64>,
) {
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            tracing::error!(error = %e, "error waiting for shutdown signal");
        }
        info!("shutdown signal received");
        cancel_token.cancel();
    });

    #[cfg(unix)]
    if let Some(seconds) = smallest_delay {
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigusr1 = match signal(SignalKind::user_defined1()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "could not install SIGUSR1 handler");
                    return;
                }
            };

            while sigusr1.recv().await.is_some() {
                info!(seconds, "SIGUSR1: deferral requested");
                if delay_tx.send(seconds).await.is_err() {
                    // Coordinator gone - nothing left to defer.
                    break;
                }
            }
        });
    }
    #[cfg(not(unix))]
    let _ = (delay_tx, smallest_delay);
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("received Ctrl+C");
    }

    Ok(())
}
