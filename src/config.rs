//! # Summary
//!
//! Construction-time configuration for the register and lease layers, using
//! a chained builder (`new()` plus `with_*` setters) over plain `Duration`
//! fields. Defaults: `epsilon = 1s`, `tmax = 14s`; phase deadlines default to
//! read ≈200ms, write ≈50ms, response-send ≈50ms.

use std::time::Duration;

/// Tuning knobs for a [`crate::register::RoundRegister`]'s proposer-side phases.
#[derive(Copy, Clone, Debug)]
pub struct RegisterConfig {
    /// Deadline for a read phase to reach quorum.
    read_deadline: Duration,
    /// Deadline for a write phase to reach quorum.
    write_deadline: Duration,
    /// Deadline an acceptor allows itself to send a single response before
    /// giving up on that peer.
    response_send_deadline: Duration,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        RegisterConfig {
            read_deadline: Duration::from_millis(200),
            write_deadline: Duration::from_millis(50),
            response_send_deadline: Duration::from_millis(50),
        }
    }
}

impl RegisterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_deadline(mut self, deadline: Duration) -> Self {
        self.read_deadline = deadline;
        self
    }

    pub fn with_write_deadline(mut self, deadline: Duration) -> Self {
        self.write_deadline = deadline;
        self
    }

    pub fn with_response_send_deadline(mut self, deadline: Duration) -> Self {
        self.response_send_deadline = deadline;
        self
    }

    pub fn read_deadline(&self) -> Duration {
        self.read_deadline
    }

    pub fn write_deadline(&self) -> Duration {
        self.write_deadline
    }

    pub fn response_send_deadline(&self) -> Duration {
        self.response_send_deadline
    }
}

/// Tuning knobs for a [`crate::lease::Flease`] instance.
#[derive(Copy, Clone, Debug)]
pub struct FleaseConfig {
    /// Upper bound on clock skew between any two peers.
    epsilon: Duration,
    /// Maximum duration a lease remains valid from issuance.
    tmax: Duration,
}

impl Default for FleaseConfig {
    fn default() -> Self {
        FleaseConfig {
            epsilon: Duration::from_secs(1),
            tmax: Duration::from_secs(14),
        }
    }
}

impl FleaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures `epsilon`, the upper bound on clock skew between any two peers.
    pub fn with_epsilon(mut self, epsilon: Duration) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Configures `tmax`, the maximum lease validity span.
    pub fn with_tmax(mut self, tmax: Duration) -> Self {
        self.tmax = tmax;
        self
    }

    pub fn epsilon(&self) -> Duration {
        self.epsilon
    }

    pub fn tmax(&self) -> Duration {
        self.tmax
    }

    /// `tmax + epsilon`: the boot-quiescence window an acceptor must sleep
    /// through before it can safely acknowledge anything (§4.2, §4.4).
    pub fn boot_quiescence(&self) -> Duration {
        self.tmax + self.epsilon
    }
}
