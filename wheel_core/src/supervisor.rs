//! Emergency-stop latch shared in shape by the embedded loop and the
//! bridge: Armed until an explicit stop, a heartbeat timeout, or too many
//! consecutive command errors, then EmergencyStopped until external reset.
//!
//! The latch event is surfaced exactly once via `take_latch_event` so the
//! caller issues its stop command exactly once per latch, not every tick.

use std::fmt;
use std::time::{Duration, Instant};

use wheel_config::SafetyCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchReason {
    EmergencyStop,
    HeartbeatTimeout,
    ErrorOverflow,
}

impl fmt::Display for LatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EmergencyStop => "emergency stop commanded",
            Self::HeartbeatTimeout => "heartbeat timeout",
            Self::ErrorOverflow => "consecutive error threshold exceeded",
        })
    }
}

#[derive(Debug)]
pub struct Supervisor {
    heartbeat_timeout: Duration,
    max_consecutive_errors: u32,
    max_velocity_rpm: f32,
    latched: Option<LatchReason>,
    pending_event: Option<LatchReason>,
    /// None until a client has ever connected; timeouts only apply after
    last_heartbeat: Option<Instant>,
    consecutive_errors: u32,
}

impl Supervisor {
    pub fn new(cfg: &SafetyCfg) -> Self {
        Self {
            heartbeat_timeout: Duration::from_millis(cfg.heartbeat_timeout_ms),
            max_consecutive_errors: cfg.max_consecutive_errors,
            max_velocity_rpm: cfg.max_velocity_rpm,
            latched: None,
            pending_event: None,
            last_heartbeat: None,
            consecutive_errors: 0,
        }
    }

    pub fn is_latched(&self) -> bool {
        self.latched.is_some()
    }

    pub fn latch_reason(&self) -> Option<LatchReason> {
        self.latched
    }

    /// Record peer liveness (any traffic counts as a heartbeat).
    pub fn heartbeat(&mut self, now: Instant) {
        self.last_heartbeat = Some(now);
    }

    /// Explicit emergency stop.
    pub fn trip_emergency_stop(&mut self) {
        self.latch(LatchReason::EmergencyStop);
    }

    pub fn record_error(&mut self) {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        if self.consecutive_errors >= self.max_consecutive_errors {
            self.latch(LatchReason::ErrorOverflow);
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_errors = 0;
    }

    /// Evaluate time-based conditions; call once per loop iteration.
    pub fn check(&mut self, now: Instant) {
        if self.latched.is_some() {
            return;
        }
        if let Some(last) = self.last_heartbeat
            && now.saturating_duration_since(last) > self.heartbeat_timeout
        {
            self.latch(LatchReason::HeartbeatTimeout);
        }
    }

    /// The one-shot latch event. Returns `Some` exactly once per latch.
    pub fn take_latch_event(&mut self) -> Option<LatchReason> {
        self.pending_event.take()
    }

    /// Soft check: velocity out of bounds is recoverable, the caller should
    /// reissue a stop but must not latch.
    pub fn velocity_exceeded(&self, rpm: f32) -> bool {
        rpm.abs() > self.max_velocity_rpm
    }

    /// Reset to Armed. External operator action, never automatic.
    pub fn reset(&mut self) {
        self.latched = None;
        self.pending_event = None;
        self.consecutive_errors = 0;
        self.last_heartbeat = None;
    }

    fn latch(&mut self, reason: LatchReason) {
        if self.latched.is_none() {
            tracing::error!(%reason, "emergency stop latched");
            self.latched = Some(reason);
            self.pending_event = Some(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sup() -> Supervisor {
        Supervisor::new(&SafetyCfg::default())
    }

    #[test]
    fn no_heartbeat_ever_means_no_timeout() {
        let mut s = sup();
        let t0 = Instant::now();
        s.check(t0 + Duration::from_secs(3600));
        assert!(!s.is_latched());
    }

    #[test]
    fn heartbeat_timeout_latches_once() {
        let mut s = sup();
        let t0 = Instant::now();
        s.heartbeat(t0);
        s.check(t0 + Duration::from_secs(4));
        assert!(!s.is_latched());
        s.check(t0 + Duration::from_secs(6));
        assert!(s.is_latched());
        assert_eq!(s.take_latch_event(), Some(LatchReason::HeartbeatTimeout));
        // Subsequent checks do not re-raise the event.
        s.check(t0 + Duration::from_secs(8));
        assert_eq!(s.take_latch_event(), None);
    }

    #[test]
    fn error_overflow_latches_and_success_resets_count() {
        let mut s = sup();
        for _ in 0..9 {
            s.record_error();
        }
        assert!(!s.is_latched());
        s.record_success();
        for _ in 0..9 {
            s.record_error();
        }
        assert!(!s.is_latched());
        s.record_error();
        assert!(s.is_latched());
        assert_eq!(s.take_latch_event(), Some(LatchReason::ErrorOverflow));
    }

    #[test]
    fn explicit_stop_wins_and_keeps_first_reason() {
        let mut s = sup();
        s.trip_emergency_stop();
        for _ in 0..20 {
            s.record_error();
        }
        assert_eq!(s.latch_reason(), Some(LatchReason::EmergencyStop));
        assert_eq!(s.take_latch_event(), Some(LatchReason::EmergencyStop));
    }

    #[test]
    fn velocity_violation_is_soft() {
        let s = sup();
        assert!(s.velocity_exceeded(120.0));
        assert!(s.velocity_exceeded(-120.0));
        assert!(!s.velocity_exceeded(99.0));
        assert!(!s.is_latched());
    }

    #[test]
    fn reset_rearms() {
        let mut s = sup();
        s.trip_emergency_stop();
        assert!(s.is_latched());
        s.reset();
        assert!(!s.is_latched());
        assert_eq!(s.take_latch_event(), None);
    }
}
