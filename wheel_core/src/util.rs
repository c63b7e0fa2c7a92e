//! Common time/period helpers for wheel_core.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Loop timestep in seconds for a given period in milliseconds.
/// Clamps the period to at least 1 ms.
#[inline]
pub fn dt_secs(period_ms: u64) -> f32 {
    period_ms.max(1) as f32 / MILLIS_PER_SEC as f32
}

/// Signum restricted to {-1, 0, +1} as an i8.
#[inline]
pub fn sign_i8(v: f32) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dt_secs_clamps_zero_period() {
        assert!((dt_secs(0) - 0.001).abs() < 1e-9);
        assert!((dt_secs(10) - 0.01).abs() < 1e-9);
    }

    #[test]
    fn sign_i8_covers_zero() {
        assert_eq!(sign_i8(3.5), 1);
        assert_eq!(sign_i8(-0.1), -1);
        assert_eq!(sign_i8(0.0), 0);
    }
}
