//! Countdown coordinator.
//!
//! The coordinator is the single owner of the countdown state machine.
//! It drives a one-second tick, applies operator deferral requests, and
//! runs the one-shot expiry decision: spend a delay credit on the
//! smallest configured option, or raise the reboot-now flag. Either way
//! the loop ends - the actual reboot belongs to an external scheduler.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Store failures are logged and never block the reboot decision; the
//!   in-memory countdown drives the outcome

use std::time::Duration;

use rbn_core::{ActionKind, CountdownState};
use rbn_store::{ActionJournal, ConfigHandle};
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the expiry decision settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// Credit remained: the smallest delay option was applied and the
    /// reboot was rescheduled for that many seconds out.
    Delayed(u64),

    /// No credit (or no options): the immediate-reboot flag was raised.
    RebootNow,
}

/// Drives the countdown and owns its state machine.
///
/// # Ownership
///
/// The countdown is mutated only here: by the tick loop and by
/// [`Coordinator::request_delay`]. Other components only ever receive
/// `remaining_seconds` as a snapshot value.
pub struct Coordinator {
    countdown: CountdownState,
    config: ConfigHandle,
    journal: ActionJournal,
}

impl Coordinator {
    /// Creates a coordinator around the policy inputs and store handles.
    pub fn new(countdown: CountdownState, config: ConfigHandle, journal: ActionJournal) -> Self {
        Self {
            countdown,
            config,
            journal,
        }
    }

    /// Seconds left on the countdown.
    pub fn remaining_seconds(&self) -> u64 {
        self.countdown.remaining_seconds()
    }

    /// Smallest configured delay option, if any.
    pub fn smallest_delay_option(&self) -> Option<u64> {
        self.countdown.smallest_delay_option()
    }

    /// Applies an operator deferral request.
    ///
    /// The state machine's admission check runs first; only an accepted
    /// delay touches the config store and the journal. A rejected
    /// duration changes nothing and returns `false` - that is normal
    /// control flow, not an error.
    pub async fn request_delay(&mut self, seconds: u64) -> bool {
        if !self.countdown.apply_delay(seconds) {
            info!(seconds, "delay request rejected: not a configured option");
            return false;
        }

        if let Err(e) = self.config.apply_delay(seconds).await {
            warn!(error = %e, "config store unavailable while recording delay");
        }
        self.journal
            .record(ActionKind::Delayed, self.countdown.remaining_seconds());

        info!(
            seconds,
            remaining = self.countdown.remaining_seconds(),
            "reboot deferred by operator"
        );
        true
    }

    /// Advances the countdown one second. Returns true on expiry.
    pub fn on_tick(&mut self) -> bool {
        self.countdown.tick();
        debug!(remaining = self.countdown.remaining_seconds(), "tick");
        self.countdown.is_expired()
    }

    /// Runs the expiry decision, exactly once per expiry.
    ///
    /// Credit above zero plus at least one configured option means the
    /// smallest option is auto-applied; anything else raises the
    /// reboot-now flag. Deterministic, no retry; a store failure is
    /// logged and the in-memory decision stands.
    pub async fn handle_expiry(&mut self) -> ExpiryOutcome {
        let credit = match self.config.delay_counter().await {
            Ok(credit) => credit,
            Err(e) => {
                warn!(error = %e, "config store unavailable at expiry; assuming no credit");
                0
            }
        };

        match self.countdown.smallest_delay_option() {
            Some(smallest) if credit > 0 => {
                // Our own option set, so admission always passes.
                self.countdown.apply_delay(smallest);
                if let Err(e) = self.config.apply_delay(smallest).await {
                    warn!(error = %e, "config store unavailable while recording auto-delay");
                }
                self.journal
                    .record(ActionKind::AutoDelayed, self.countdown.remaining_seconds());

                info!(
                    seconds = smallest,
                    credit_before = credit,
                    "countdown expired with credit left; applied smallest delay"
                );
                ExpiryOutcome::Delayed(smallest)
            }
            _ => {
                if let Err(e) = self.config.set_reboot_now().await {
                    warn!(error = %e, "config store unavailable while flagging reboot");
                }
                self.journal.record(ActionKind::RebootNow, 0);

                info!(credit, "countdown expired; reboot-now flagged");
                ExpiryOutcome::RebootNow
            }
        }
    }

    /// Runs the tick loop until expiry or cancellation.
    ///
    /// Deferral requests arrive over `delay_requests` (the stand-in for
    /// the notice panel's buttons). Cancellation lands only at tick
    /// boundaries, so there is never partial-tick state to reconcile.
    /// Returns `None` when cancelled, `Some(outcome)` on expiry.
    pub async fn run(
        mut self,
        cancel: CancellationToken,
        mut delay_requests: mpsc::Receiver<u64>,
    ) -> Option<ExpiryOutcome> {
        let mut ticker = interval(Duration::from_secs(1));
        // The first tick completes immediately; consume it so the
        // countdown loses its first second a full second from now.
        ticker.tick().await;

        let mut requests_open = true;

        info!(
            remaining = self.countdown.remaining_seconds(),
            options = ?self.countdown.allowed_delay_options(),
            "countdown started"
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!(
                        remaining = self.countdown.remaining_seconds(),
                        "countdown cancelled"
                    );
                    self.journal.sync().await;
                    return None;
                }

                request = delay_requests.recv(), if requests_open => {
                    match request {
                        Some(seconds) => {
                            self.request_delay(seconds).await;
                        }
                        None => requests_open = false,
                    }
                }

                _ = ticker.tick() => {
                    if self.on_tick() {
                        let outcome = self.handle_expiry().await;
                        self.journal.sync().await;
                        return Some(outcome);
                    }
                }
            }
        }
    }
}
