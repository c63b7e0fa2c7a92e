//! Position-loop PID producing a velocity command in RPM.

use wheel_config::PidCfg;

#[derive(Debug, Clone)]
pub struct Pid {
    kp: f32,
    ki: f32,
    kd: f32,
    integral_clamp: f32,
    output_limit_rpm: f32,
    integral: f32,
    last_error: f32,
}

impl Pid {
    pub fn new(cfg: &PidCfg) -> Self {
        Self {
            kp: cfg.kp,
            ki: cfg.ki,
            kd: cfg.kd,
            integral_clamp: cfg.integral_clamp,
            output_limit_rpm: cfg.max_velocity_rpm,
            integral: 0.0,
            last_error: 0.0,
        }
    }

    /// Replace the gains and reset accumulated state. A gain change makes
    /// the stored integral and last-error meaningless for the new tuning.
    pub fn set_gains(&mut self, kp: f32, ki: f32, kd: f32) {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
        self.reset();
    }

    /// Clear integrator and last-error. Call on every new target, on zero,
    /// and on (re)entry into position mode; prevents derivative kick and
    /// integral carry-over between unrelated moves.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
    }

    #[cfg(test)]
    pub(crate) fn integral(&self) -> f32 {
        self.integral
    }

    /// One backward-difference step over the fixed loop period.
    /// Returns a velocity command clamped to the position-control limit.
    pub fn step(&mut self, error_deg: f32, dt_s: f32) -> f32 {
        self.integral =
            (self.integral + error_deg * dt_s).clamp(-self.integral_clamp, self.integral_clamp);
        let derivative = if dt_s > 0.0 {
            (error_deg - self.last_error) / dt_s
        } else {
            0.0
        };
        self.last_error = error_deg;
        (self.kp * error_deg + self.ki * self.integral + self.kd * derivative)
            .clamp(-self.output_limit_rpm, self.output_limit_rpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid() -> Pid {
        Pid::new(&PidCfg::default())
    }

    #[test]
    fn proportional_only_on_first_step_without_history() {
        let mut p = pid();
        // kp=2.0, ki=0.1, kd=0.05, dt=0.01: integral and derivative are tiny
        let out = p.step(10.0, 0.01);
        // 2*10 + 0.1*0.1 + 0.05*1000 = 70.01 -> clamped to 50
        assert!((out - 50.0).abs() < 1e-3);
    }

    #[test]
    fn integral_clamps_at_limit() {
        let mut p = pid();
        for _ in 0..200_000 {
            p.step(100.0, 0.01);
        }
        assert!(p.integral() <= 100.0 + f32::EPSILON);
    }

    #[test]
    fn output_clamped_to_velocity_limit() {
        let mut p = pid();
        assert!(p.step(10_000.0, 0.01) <= 50.0);
        p.reset();
        assert!(p.step(-10_000.0, 0.01) >= -50.0);
    }

    #[test]
    fn reset_clears_accumulated_state() {
        let mut p = pid();
        for _ in 0..100 {
            p.step(50.0, 0.01);
        }
        assert!(p.integral() > 0.0);
        p.reset();
        assert_eq!(p.integral(), 0.0);
    }

    #[test]
    fn gain_change_resets_state() {
        let mut p = pid();
        p.step(50.0, 0.01);
        p.set_gains(1.0, 0.0, 0.0);
        assert_eq!(p.integral(), 0.0);
        let out = p.step(10.0, 0.01);
        assert!((out - 10.0).abs() < 1e-5);
    }
}
