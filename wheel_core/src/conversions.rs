//! Unit and duty-cycle conversions shared by the drive and wall paths.

/// Encoder count to output-shaft angle in degrees.
#[inline]
pub fn counts_to_degrees(count: i64, counts_per_output_rev: f32) -> f32 {
    count as f32 / counts_per_output_rev * 360.0
}

/// Output-shaft RPM from a count delta over `dt_s` seconds.
#[inline]
pub fn rpm_from_counts(delta: i64, dt_s: f32, counts_per_output_rev: f32) -> f32 {
    if dt_s <= 0.0 {
        return 0.0;
    }
    delta as f32 / dt_s / counts_per_output_rev * 60.0
}

/// Linear duty fraction for a speed command: `|rpm| / max_rpm`, clamped to 1.
#[inline]
pub fn duty_fraction_from_rpm(rpm: f32, max_rpm: f32) -> f32 {
    (rpm.abs() / max_rpm).clamp(0.0, 1.0)
}

/// Square-root torque-to-duty map used by the wall renderer, the brake path
/// and force-assist drive. Models the driver's torque/duty nonlinearity;
/// the shape is load-bearing for force rendering, do not linearize.
#[inline]
pub fn duty_fraction_from_torque(torque_nm: f32, torque_constant_nm: f32) -> f32 {
    if torque_nm <= 0.0 {
        return 0.0;
    }
    (torque_nm / torque_constant_nm).sqrt()
}

/// Handle force (N) to motor-shaft torque (N·m) through the handle radius
/// and the gearbox.
#[inline]
pub fn motor_torque_from_force(force_n: f32, handle_radius_m: f32, gear_ratio: f32) -> f32 {
    force_n * handle_radius_m / gear_ratio
}

/// Map a duty fraction into the `[min_duty, max_duty]` span. Zero fraction
/// is zero duty (coast), anything above zero starts at the deadband floor.
#[inline]
pub fn duty_from_fraction(frac: f32, min_duty: u16, max_duty: u16) -> u16 {
    if frac <= 0.0 {
        return 0;
    }
    let span = f32::from(max_duty) - f32::from(min_duty);
    let duty = f32::from(min_duty) + frac.min(1.0) * span;
    // Round-to-nearest; the clamp keeps float noise inside u16.
    (duty + 0.5).clamp(0.0, f32::from(u16::MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPR_OUT: f32 = 64.0 * 30.0;

    #[test]
    fn counts_map_exactly_to_degrees() {
        assert!((counts_to_degrees(0, CPR_OUT)).abs() < 1e-6);
        assert!((counts_to_degrees(1920, CPR_OUT) - 360.0).abs() < 1e-3);
        assert!((counts_to_degrees(-960, CPR_OUT) + 180.0).abs() < 1e-3);
    }

    #[test]
    fn rpm_from_counts_is_signed() {
        // 1920 counts in one second = 1 rev/s = 60 RPM
        assert!((rpm_from_counts(1920, 1.0, CPR_OUT) - 60.0).abs() < 1e-3);
        assert!((rpm_from_counts(-192, 0.1, CPR_OUT) + 60.0).abs() < 1e-3);
        assert_eq!(rpm_from_counts(100, 0.0, CPR_OUT), 0.0);
    }

    #[test]
    fn duty_fraction_clamps_at_full_scale() {
        assert!((duty_fraction_from_rpm(75.0, 150.0) - 0.5).abs() < 1e-6);
        assert!((duty_fraction_from_rpm(-300.0, 150.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sqrt_map_is_concave_not_linear() {
        let quarter = duty_fraction_from_torque(0.0625, 0.25);
        assert!((quarter - 0.5).abs() < 1e-6);
        assert_eq!(duty_fraction_from_torque(0.0, 0.25), 0.0);
        assert_eq!(duty_fraction_from_torque(-1.0, 0.25), 0.0);
    }

    #[test]
    fn duty_span_starts_at_deadband_floor() {
        assert_eq!(duty_from_fraction(0.0, 1000, 65535), 0);
        assert_eq!(duty_from_fraction(1.0, 1000, 65535), 65535);
        let low = duty_from_fraction(1e-4, 1000, 65535);
        assert!(low >= 1000, "tiny nonzero command must clear the deadband");
    }

    #[test]
    fn duty_span_is_monotonic() {
        let mut prev = 0;
        for i in 1..=100 {
            let d = duty_from_fraction(i as f32 / 100.0, 1000, 65535);
            assert!(d >= prev);
            prev = d;
        }
    }
}
