//! Virtual-wall haptic renderer.
//!
//! The wall is a captured contact angle plus a penetration direction; per
//! tick the renderer converts penetration past the contact point into a
//! spring force with a superimposed vibration texture, then maps the force
//! through the square-root torque-to-duty curve. Drive direction always
//! pushes the handle back out of the wall.

use wheel_config::{MotorCfg, WallCfg};

use crate::conversions;

/// State captured when a wall engages. Cleared (not zeroed) on release or
/// stop; re-engaging recaptures the contact angle.
#[derive(Debug, Clone, PartialEq)]
pub struct WallState {
    pub contact_angle_deg: f32,
    /// +1 or -1; the side of the contact angle that counts as "into" the wall
    pub direction: i8,
    /// Requested wall force, already clamped to the configured maximum
    pub force_n: f32,
    pub vibration_hz: f32,
    /// Break-away force; accepted and reported, no yield physics yet
    pub yield_force_n: f32,
}

/// One tick's worth of wall output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallDrive {
    /// Direction pins to assert; 0 means coast (inside the deadband)
    pub direction: i8,
    pub duty: u16,
}

/// Resolve the penetration direction when engaging.
///
/// Precedence: explicit hint from the caller, then the sign of the current
/// velocity when it is clearly nonzero, then the last recorded motion
/// direction, then +1.
pub fn resolve_direction(hint: Option<i8>, velocity_rpm: f32, last_motion_dir: i8) -> i8 {
    if let Some(h) = hint {
        return if h < 0 { -1 } else { 1 };
    }
    if velocity_rpm.abs() > 0.5 {
        return if velocity_rpm < 0.0 { -1 } else { 1 };
    }
    if last_motion_dir != 0 {
        return last_motion_dir;
    }
    1
}

/// Clamp a requested wall force into the renderable range.
pub fn clamp_force(force_n: f32, cfg: &WallCfg) -> f32 {
    force_n.clamp(0.0, cfg.max_force_n)
}

/// Render one control tick while engaged.
///
/// `t_wall_s` is wall-clock seconds since an arbitrary epoch; the texture
/// phase is sampled against it so the vibration frequency is independent
/// of loop jitter.
pub fn render(
    wall: &WallState,
    cfg: &WallCfg,
    motor: &MotorCfg,
    position_deg: f32,
    t_wall_s: f32,
) -> WallDrive {
    let penetration_deg =
        (position_deg - wall.contact_angle_deg) * f32::from(wall.direction);
    // Hysteresis: inside the deadband the handle is back outside the wall;
    // render nothing but stay engaged so boundary oscillation cannot
    // re-trigger a capture.
    if penetration_deg < cfg.release_deadband_deg {
        return WallDrive {
            direction: 0,
            duty: 0,
        };
    }

    let displacement_m = penetration_deg.to_radians() * cfg.handle_radius_m;
    let spring_n = cfg.spring_n_per_m * displacement_m;
    let texture_n =
        spring_n * (std::f32::consts::TAU * wall.vibration_hz * t_wall_s).sin();
    // Texture never pulls the handle further in, and the rendered force
    // never exceeds what was asked for.
    let force_n = (spring_n + texture_n).clamp(0.0, wall.force_n);

    let torque_nm =
        conversions::motor_torque_from_force(force_n, cfg.handle_radius_m, motor.gear_ratio);
    let frac = conversions::duty_fraction_from_torque(torque_nm, cfg.torque_constant_nm)
        .min(cfg.max_duty_frac);
    let duty = conversions::duty_from_fraction(frac, motor.min_duty, motor.max_duty);

    WallDrive {
        direction: -wall.direction,
        duty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(force_n: f32, direction: i8) -> WallState {
        WallState {
            contact_angle_deg: 90.0,
            direction,
            force_n,
            vibration_hz: 25.0,
            yield_force_n: 0.0,
        }
    }

    fn cfgs() -> (WallCfg, MotorCfg) {
        (WallCfg::default(), MotorCfg::default())
    }

    #[test]
    fn direction_precedence() {
        assert_eq!(resolve_direction(Some(-1), 10.0, 1), -1);
        assert_eq!(resolve_direction(None, -2.0, 1), -1);
        assert_eq!(resolve_direction(None, 0.3, -1), -1); // below 0.5 RPM
        assert_eq!(resolve_direction(None, 0.0, 0), 1);
    }

    #[test]
    fn inside_deadband_renders_nothing() {
        let (wc, mc) = cfgs();
        let w = wall(20.0, 1);
        let out = render(&w, &wc, &mc, 90.1, 0.0);
        assert_eq!(out, WallDrive { direction: 0, duty: 0 });
        // Behind the contact angle entirely
        let out = render(&w, &wc, &mc, 85.0, 0.0);
        assert_eq!(out.duty, 0);
    }

    #[test]
    fn penetration_drives_back_out() {
        let (wc, mc) = cfgs();
        let w = wall(20.0, 1);
        let out = render(&w, &wc, &mc, 91.0, 0.0);
        assert!(out.duty > 0);
        assert_eq!(out.direction, -1);

        let neg = wall(20.0, -1);
        let out = render(&neg, &wc, &mc, 89.0, 0.0);
        assert!(out.duty > 0);
        assert_eq!(out.direction, 1);
    }

    #[test]
    fn duty_strictly_increases_with_penetration() {
        let (wc, mc) = cfgs();
        let w = wall(50.0, 1);
        // Fixed sample time so the texture phase is constant.
        let mut prev = 0;
        for deg in [91.0, 92.0, 94.0, 98.0, 106.0] {
            let out = render(&w, &wc, &mc, deg, 0.1);
            assert!(out.duty > prev, "duty not increasing at {deg}");
            prev = out.duty;
        }
    }

    #[test]
    fn rendered_force_capped_at_request() {
        let (wc, mc) = cfgs();
        let shallow = wall(1.0, 1);
        let deep = render(&shallow, &wc, &mc, 150.0, 0.0);
        let very_deep = render(&shallow, &wc, &mc, 300.0, 0.0);
        // Once the spring force passes the requested 1 N the output pins.
        assert_eq!(deep.duty, very_deep.duty);
    }

    #[test]
    fn request_clamped_to_max_force() {
        let wc = WallCfg::default();
        assert_eq!(clamp_force(60.0, &wc), 50.0);
        assert_eq!(clamp_force(-3.0, &wc), 0.0);
        assert_eq!(clamp_force(20.0, &wc), 20.0);
    }
}
