//! Countdown state machine for the mandatory-reboot notice.
//!
//! The state machine is pure in-memory state: remaining seconds, the
//! set of delay durations the operator may pick, and an optional cap on
//! total accumulated delay. It is constructed once at process start and
//! only ever mutated from the coordinator's single tick loop, so it
//! needs no internal synchronization.

use tracing::debug;

/// Countdown toward a mandatory reboot.
///
/// Lifecycle: `Counting(remaining > 0)` transitions monotonically to
/// `Expired(remaining == 0)` one `tick()` at a time. The only way back
/// to `Counting` is `apply_delay()`, which adds one of the configured
/// delay durations.
///
/// # Ownership
///
/// Owned exclusively by the coordinator. Other components only ever see
/// `remaining_seconds()` as a snapshot value at the moment of logging.
#[derive(Debug, Clone)]
pub struct CountdownState {
    /// Seconds left until the reboot decision fires.
    remaining_seconds: u64,

    /// Delay durations the operator may choose, ascending and distinct.
    allowed_delay_options: Vec<u64>,

    /// Cap on total accumulated delay.
    ///
    /// Accepted at construction and carried, but not consulted by
    /// `apply_delay`. Kept so the construction surface matches the
    /// policy inputs the host supplies.
    max_total_delay: Option<u64>,
}

impl CountdownState {
    /// Creates a countdown with the given policy inputs.
    ///
    /// Delay options are sorted ascending, deduplicated, and stripped of
    /// zero entries so the stored set always satisfies the "ascending
    /// sequence of distinct positive integers" invariant regardless of
    /// what the host handed us.
    pub fn new(
        initial_seconds: u64,
        delay_options: Vec<u64>,
        max_total_delay: Option<u64>,
    ) -> Self {
        let mut allowed_delay_options: Vec<u64> =
            delay_options.into_iter().filter(|&s| s > 0).collect();
        allowed_delay_options.sort_unstable();
        allowed_delay_options.dedup();

        Self {
            remaining_seconds: initial_seconds,
            allowed_delay_options,
            max_total_delay,
        }
    }

    /// Advances the countdown by one second.
    ///
    /// No-op once expired: calling `tick()` at zero leaves the state at
    /// zero, so a late or duplicate timer fire is harmless.
    pub fn tick(&mut self) {
        if self.remaining_seconds > 0 {
            self.remaining_seconds -= 1;
        }
    }

    /// Applies an operator-chosen delay.
    ///
    /// Returns `false` without mutating anything if `seconds` is not one
    /// of the configured delay options. This is the sole admission check;
    /// the delay-credit policy belongs to the caller.
    pub fn apply_delay(&mut self, seconds: u64) -> bool {
        if !self.allowed_delay_options.contains(&seconds) {
            debug!(seconds, "delay rejected: not an allowed option");
            return false;
        }
        self.remaining_seconds += seconds;
        true
    }

    /// True once the countdown has reached zero.
    pub fn is_expired(&self) -> bool {
        self.remaining_seconds == 0
    }

    /// Seconds left until expiry.
    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    /// The configured delay options, ascending.
    pub fn allowed_delay_options(&self) -> &[u64] {
        &self.allowed_delay_options
    }

    /// The smallest configured delay option, if any exist.
    pub fn smallest_delay_option(&self) -> Option<u64> {
        self.allowed_delay_options.first().copied()
    }

    /// The accepted (currently unenforced) total-delay cap.
    pub fn max_total_delay(&self) -> Option<u64> {
        self.max_total_delay
    }
}
