//! Motor drive output: signed speed, force-derived duty, short-brake and
//! raw overrides on top of an `HBridge`.

use wheel_config::MotorCfg;
use wheel_traits::HBridge;

use crate::conversions;
use crate::error::ControlError;

pub struct MotorDrive<B: HBridge> {
    bridge: B,
    cfg: MotorCfg,
    /// Haptic brake level [0,1]; nonzero overrides any speed command
    brake_level: f32,
}

impl<B: HBridge> MotorDrive<B> {
    pub fn new(bridge: B, cfg: MotorCfg) -> Self {
        Self {
            bridge,
            cfg,
            brake_level: 0.0,
        }
    }

    pub fn set_brake_level(&mut self, level: f32) {
        self.brake_level = level.clamp(0.0, 1.0);
    }

    pub fn brake_level(&self) -> f32 {
        self.brake_level
    }

    /// Signed speed command in RPM. Below the stop threshold the motor
    /// coasts; a nonzero brake level overrides the command entirely.
    pub fn drive_rpm(&mut self, rpm: f32) -> Result<(), ControlError> {
        if self.brake_level > 0.0 {
            return self.apply_brake();
        }
        if rpm.abs() < self.cfg.stop_threshold_rpm {
            return self.coast();
        }
        let frac = conversions::duty_fraction_from_rpm(rpm, self.cfg.max_rpm);
        let duty = conversions::duty_from_fraction(frac, self.cfg.min_duty, self.cfg.max_duty);
        self.set_direction(if rpm > 0.0 { 1 } else { -1 })?;
        self.set_duty(duty)
    }

    /// Duty-fraction command with an explicit direction, used by the wall
    /// renderer and force-assist drive. Direction 0 coasts; a nonzero brake
    /// level overrides the command entirely.
    pub fn drive_duty(&mut self, direction: i8, frac: f32) -> Result<(), ControlError> {
        if self.brake_level > 0.0 {
            return self.apply_brake();
        }
        if direction == 0 || frac <= 0.0 {
            return self.coast();
        }
        let duty = conversions::duty_from_fraction(frac, self.cfg.min_duty, self.cfg.max_duty);
        self.set_direction(direction)?;
        self.set_duty(duty)
    }

    /// Pre-mapped duty with an explicit direction, used for wall output
    /// where the renderer already applied the duty span. Direction 0 or
    /// zero duty coasts; a nonzero brake level overrides the command
    /// entirely.
    pub fn drive_mapped(&mut self, direction: i8, duty: u16) -> Result<(), ControlError> {
        if self.brake_level > 0.0 {
            return self.apply_brake();
        }
        if direction == 0 || duty == 0 {
            return self.coast();
        }
        self.set_direction(direction)?;
        self.set_duty(duty)
    }

    /// Short-brake: both direction lines high, duty from the square-root of
    /// the brake fraction, capped so a sustained short cannot overheat the
    /// windings.
    pub fn apply_brake(&mut self) -> Result<(), ControlError> {
        let frac = self
            .brake_level
            .sqrt()
            .min(self.cfg.max_brake_scale);
        let duty = conversions::duty_from_fraction(frac, self.cfg.min_duty, self.cfg.max_duty);
        self.bridge.set_direction(true, true).map_err(hw)?;
        self.bridge.set_duty(duty).map_err(hw)
    }

    /// Zero duty, both direction lines low.
    pub fn coast(&mut self) -> Result<(), ControlError> {
        self.bridge.set_duty(0).map_err(hw)?;
        self.bridge.set_direction(false, false).map_err(hw)
    }

    /// Hard stop of the output stage; identical actuation to `coast` but
    /// named for the fail-safe paths.
    pub fn stop(&mut self) -> Result<(), ControlError> {
        self.coast()
    }

    /// Direct driver override for debugging.
    pub fn raw(&mut self, duty: u16, in1: bool, in2: bool) -> Result<(), ControlError> {
        self.bridge.set_direction(in1, in2).map_err(hw)?;
        self.bridge.set_duty(duty).map_err(hw)
    }

    fn set_direction(&mut self, dir: i8) -> Result<(), ControlError> {
        let (in1, in2) = if dir > 0 { (true, false) } else { (false, true) };
        self.bridge.set_direction(in1, in2).map_err(hw)
    }

    fn set_duty(&mut self, duty: u16) -> Result<(), ControlError> {
        self.bridge.set_duty(duty).map_err(hw)
    }
}

fn hw(e: Box<dyn std::error::Error + Send + Sync>) -> ControlError {
    ControlError::Hardware(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::SpyBridge;

    fn drive() -> (MotorDrive<SpyBridge>, crate::mocks::DriveProbe) {
        let (bridge, probe) = SpyBridge::new();
        (MotorDrive::new(bridge, MotorCfg::default()), probe)
    }

    #[test]
    fn below_threshold_coasts() {
        let (mut d, probe) = drive();
        d.drive_rpm(0.05).unwrap();
        let s = probe.snapshot();
        assert_eq!(s.duty, 0);
        assert!(!s.in1 && !s.in2);
    }

    #[test]
    fn speed_maps_into_duty_span() {
        let (mut d, probe) = drive();
        d.drive_rpm(75.0).unwrap();
        let s = probe.snapshot();
        assert!(s.in1 && !s.in2);
        // 75/150 = 0.5 into [1000, 65535]
        assert_eq!(s.duty, 33268);

        d.drive_rpm(-150.0).unwrap();
        let s = probe.snapshot();
        assert!(!s.in1 && s.in2);
        assert_eq!(s.duty, 65535);
    }

    #[test]
    fn overspeed_clamps_to_full_duty() {
        let (mut d, probe) = drive();
        d.drive_rpm(1_000.0).unwrap();
        assert_eq!(probe.snapshot().duty, 65535);
    }

    #[test]
    fn brake_overrides_speed_and_shorts_the_bridge() {
        let (mut d, probe) = drive();
        d.set_brake_level(0.25);
        d.drive_rpm(100.0).unwrap();
        let s = probe.snapshot();
        assert!(s.in1 && s.in2);
        // sqrt(0.25) = 0.5 but capped at max_brake_scale? 0.5 < 0.6, so 0.5
        assert_eq!(s.duty, 33268);
    }

    #[test]
    fn brake_overrides_duty_and_mapped_drives() {
        let (mut d, probe) = drive();
        d.set_brake_level(0.25);
        d.drive_duty(1, 0.5).unwrap();
        let s = probe.snapshot();
        assert!(s.in1 && s.in2);
        assert_eq!(s.duty, 33268);

        d.drive_mapped(-1, 40_000).unwrap();
        let s = probe.snapshot();
        assert!(s.in1 && s.in2);
        assert_eq!(s.duty, 33268);

        // In-deadband wall output must not release an active brake either.
        d.drive_mapped(0, 0).unwrap();
        let s = probe.snapshot();
        assert!(s.in1 && s.in2);
        assert!(s.duty > 0);
    }

    #[test]
    fn brake_fraction_capped_at_scale() {
        let (mut d, probe) = drive();
        d.set_brake_level(1.0);
        d.apply_brake().unwrap();
        // sqrt(1.0) capped at 0.6 into the span
        let s = probe.snapshot();
        assert_eq!(s.duty, conversions::duty_from_fraction(0.6, 1000, 65535));
    }

    #[test]
    fn stop_zeroes_everything() {
        let (mut d, probe) = drive();
        d.drive_rpm(50.0).unwrap();
        d.stop().unwrap();
        let s = probe.snapshot();
        assert_eq!(s.duty, 0);
        assert!(!s.in1 && !s.in2);
    }
}
