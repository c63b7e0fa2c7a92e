//! Quadrature encoder state shared between the edge handler and the
//! control loop.
//!
//! The edge handler may preempt the control loop at any instruction
//! boundary, so every shared field is its own atomic cell. No multi-field
//! invariant crosses the boundary; readers only need a consistent
//! single-value snapshot per field, which `Relaxed` loads provide.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::{Duration, Instant};

use crate::conversions;

/// Fields written from the edge-triggered context.
#[derive(Debug, Default)]
pub struct EncoderChannels {
    count: AtomicI64,
    last_a: AtomicBool,
    last_b: AtomicBool,
}

impl EncoderChannels {
    pub const fn new() -> Self {
        Self {
            count: AtomicI64::new(0),
            last_a: AtomicBool::new(false),
            last_b: AtomicBool::new(false),
        }
    }

    /// Seed the channel levels without counting, e.g. from the idle pin
    /// state at boot so the first real edge is not misread as motion.
    pub fn prime(&self, a: bool, b: bool) {
        self.last_a.store(a, Ordering::Relaxed);
        self.last_b.store(b, Ordering::Relaxed);
    }

    /// Edge handler: decode one electrical transition.
    ///
    /// Simplified 2-state decode: only channel-A level changes count, and
    /// the simultaneous channel-B level gives direction (`A == B` counts
    /// up, otherwise down). Half the resolution of a 4-state decoder but
    /// tolerant of noisy channel-B timing.
    pub fn on_edge(&self, a: bool, b: bool) {
        let prev_a = self.last_a.swap(a, Ordering::Relaxed);
        self.last_b.store(b, Ordering::Relaxed);
        if a == prev_a {
            return;
        }
        if a == b {
            self.count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn zero(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Control-side position/velocity estimator over a shared channel state.
///
/// Velocity is recomputed at most once per `min_window` and cached between
/// recomputes; very short windows would divide by near-zero time and
/// amplify count quantization into noise.
#[derive(Debug)]
pub struct EncoderTracker {
    channels: Arc<EncoderChannels>,
    counts_per_output_rev: f32,
    min_window: Duration,
    last_instant: Instant,
    last_count: i64,
    cached_rpm: f32,
    last_motion_dir: i8,
}

impl EncoderTracker {
    pub fn new(
        channels: Arc<EncoderChannels>,
        counts_per_output_rev: f32,
        min_window: Duration,
        now: Instant,
    ) -> Self {
        Self {
            channels,
            counts_per_output_rev,
            min_window,
            last_instant: now,
            last_count: 0,
            cached_rpm: 0.0,
            last_motion_dir: 0,
        }
    }

    /// Output-shaft angle in degrees, `count / counts_per_output_rev * 360`.
    pub fn position_degrees(&self) -> f32 {
        conversions::counts_to_degrees(self.channels.count(), self.counts_per_output_rev)
    }

    /// Output-shaft velocity in RPM; cached inside the sampling window.
    ///
    /// A nonzero count delta also records the last motion direction, used
    /// as a tie-break hint when engaging a wall.
    pub fn velocity_rpm(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last_instant);
        if dt < self.min_window {
            return self.cached_rpm;
        }
        let count = self.channels.count();
        let delta = count - self.last_count;
        self.cached_rpm = conversions::rpm_from_counts(
            delta,
            dt.as_secs_f32(),
            self.counts_per_output_rev,
        );
        if delta > 0 {
            self.last_motion_dir = 1;
        } else if delta < 0 {
            self.last_motion_dir = -1;
        }
        self.last_instant = now;
        self.last_count = count;
        self.cached_rpm
    }

    /// Sign of the most recent nonzero motion, 0 if none observed yet.
    pub fn last_motion_dir(&self) -> i8 {
        self.last_motion_dir
    }

    /// Reset the shared count and the estimator baseline.
    pub fn zero(&mut self, now: Instant) {
        self.channels.zero();
        self.last_count = 0;
        self.last_instant = now;
        self.cached_rpm = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_equals_b_counts_up() {
        let ch = EncoderChannels::new();
        ch.prime(false, true);
        ch.on_edge(true, true); // A rose, A == B
        assert_eq!(ch.count(), 1);
        ch.on_edge(false, false); // A fell, A == B
        assert_eq!(ch.count(), 2);
    }

    #[test]
    fn a_differs_from_b_counts_down() {
        let ch = EncoderChannels::new();
        ch.prime(false, false);
        ch.on_edge(true, false);
        assert_eq!(ch.count(), -1);
        ch.on_edge(false, true);
        assert_eq!(ch.count(), -2);
    }

    #[test]
    fn unchanged_a_level_is_ignored() {
        let ch = EncoderChannels::new();
        ch.prime(true, false);
        ch.on_edge(true, true); // B bounced, A steady
        assert_eq!(ch.count(), 0);
    }

    #[test]
    fn velocity_is_cached_inside_window() {
        let ch = Arc::new(EncoderChannels::new());
        let t0 = Instant::now();
        let mut tr = EncoderTracker::new(Arc::clone(&ch), 1920.0, Duration::from_millis(10), t0);

        // 192 counts in 100 ms = 0.1 rev / 0.1 s = 60 RPM
        for i in 0..192 {
            ch.on_edge(i % 2 == 0, i % 2 == 0);
        }
        let v = tr.velocity_rpm(t0 + Duration::from_millis(100));
        assert!((v - 60.0).abs() < 0.5, "got {v}");
        assert_eq!(tr.last_motion_dir(), 1);

        // Inside the window the cached value is returned untouched.
        ch.zero();
        let again = tr.velocity_rpm(t0 + Duration::from_millis(105));
        assert!((again - v).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_resets_position_and_velocity() {
        let ch = Arc::new(EncoderChannels::new());
        let t0 = Instant::now();
        let mut tr = EncoderTracker::new(Arc::clone(&ch), 1920.0, Duration::from_millis(10), t0);
        for i in 0..960 {
            ch.on_edge(i % 2 == 0, i % 2 == 0);
        }
        assert!((tr.position_degrees() - 180.0).abs() < 1e-3);
        tr.zero(t0 + Duration::from_millis(50));
        assert_eq!(ch.count(), 0);
        assert!(tr.position_degrees().abs() < 1e-6);
        assert!(tr.velocity_rpm(t0 + Duration::from_millis(55)).abs() < 1e-6);
    }
}
