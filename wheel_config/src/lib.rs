#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the handle-wheel controller and bridge.
//!
//! All sections are optional in the TOML; defaults mirror the reference
//! hardware (CQR37D geared motor, 64 CPR encoder, 30:1 gearbox, 1 kHz PWM
//! with 16-bit duty). `validate()` must pass before a config is used.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Motor, encoder, and drive-stage parameters.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MotorCfg {
    /// Encoder counts per motor-shaft revolution
    pub counts_per_rev: u32,
    /// Gearbox reduction ratio (output revs = motor revs / gear_ratio)
    pub gear_ratio: f32,
    /// RPM mapped to full drive duty
    pub max_rpm: f32,
    /// Minimum duty that overcomes the driver/motor deadband
    pub min_duty: u16,
    /// Duty ceiling (full scale of the PWM peripheral)
    pub max_duty: u16,
    /// Commands below this magnitude coast instead of driving (RPM)
    pub stop_threshold_rpm: f32,
    /// Cap on short-brake duty fraction; limits sustained-short heating
    pub max_brake_scale: f32,
}

impl Default for MotorCfg {
    fn default() -> Self {
        Self {
            counts_per_rev: 64,
            gear_ratio: 30.0,
            max_rpm: 150.0,
            min_duty: 1000,
            max_duty: 65535,
            stop_threshold_rpm: 0.1,
            max_brake_scale: 0.6,
        }
    }
}

impl MotorCfg {
    /// Encoder counts per revolution of the driven (output) shaft.
    #[inline]
    pub fn counts_per_output_rev(&self) -> f32 {
        self.counts_per_rev as f32 * self.gear_ratio
    }
}

/// Position-loop PID gains and limits.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PidCfg {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Velocity command clamp for position control (RPM)
    pub max_velocity_rpm: f32,
    /// Anti-windup clamp on the accumulated integral term
    pub integral_clamp: f32,
}

impl Default for PidCfg {
    fn default() -> Self {
        Self {
            kp: 2.0,
            ki: 0.1,
            kd: 0.05,
            max_velocity_rpm: 50.0,
            integral_clamp: 100.0,
        }
    }
}

/// Virtual-wall rendering parameters.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct WallCfg {
    /// Spring constant for penetration force (N per meter of displacement)
    pub spring_n_per_m: f32,
    /// Effective handle radius used to convert angle to displacement (m)
    pub handle_radius_m: f32,
    /// Motor torque constant for the square-root torque-to-duty map (N·m)
    pub torque_constant_nm: f32,
    /// Upper bound on the requested wall force (N)
    pub max_force_n: f32,
    /// Penetration below this renders zero drive but stays engaged (deg)
    pub release_deadband_deg: f32,
    /// Default texture vibration frequency when none is commanded (Hz)
    pub vibration_hz: f32,
    /// Duty ceiling for wall rendering, as a fraction of full scale
    pub max_duty_frac: f32,
}

impl Default for WallCfg {
    fn default() -> Self {
        Self {
            spring_n_per_m: 400.0,
            handle_radius_m: 0.1,
            torque_constant_nm: 0.25,
            max_force_n: 50.0,
            release_deadband_deg: 0.25,
            vibration_hz: 25.0,
            max_duty_frac: 1.0,
        }
    }
}

/// Embedded control-loop pacing.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ControlLoopCfg {
    /// Control tick period in milliseconds (~100 Hz)
    pub period_ms: u64,
    /// Minimum window between velocity re-estimates (ms)
    pub velocity_window_ms: u64,
}

impl Default for ControlLoopCfg {
    fn default() -> Self {
        Self {
            period_ms: 10,
            velocity_window_ms: 10,
        }
    }
}

/// Bridge transport and pacing parameters.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BridgeCfg {
    /// Serial device for the controller link (overridable via CLI/env)
    pub serial_port: Option<String>,
    pub baud: u32,
    /// TCP port the GUI connects to
    pub tcp_port: u16,
    /// How often to proactively request controller status (ms)
    pub status_poll_ms: u64,
    /// Fallback period for pushing status updates to the GUI (ms)
    pub gui_push_ms: u64,
    /// Bridge loop tick period (ms)
    pub tick_ms: u64,
}

impl Default for BridgeCfg {
    fn default() -> Self {
        Self {
            serial_port: None,
            baud: 115_200,
            tcp_port: 8765,
            status_poll_ms: 50,
            gui_push_ms: 100,
            tick_ms: 10,
        }
    }
}

/// Safety supervisor thresholds.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SafetyCfg {
    /// Latch emergency stop if no GUI traffic for this long (ms)
    pub heartbeat_timeout_ms: u64,
    /// Latch after this many consecutive command-processing errors
    pub max_consecutive_errors: u32,
    /// Soft velocity ceiling; violations reissue stop without latching (RPM)
    pub max_velocity_rpm: f32,
}

impl Default for SafetyCfg {
    fn default() -> Self {
        Self {
            heartbeat_timeout_ms: 5_000,
            max_consecutive_errors: 10,
            max_velocity_rpm: 100.0,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub motor: MotorCfg,
    pub pid: PidCfg,
    pub wall: WallCfg,
    pub control_loop: ControlLoopCfg,
    pub bridge: BridgeCfg,
    pub safety: SafetyCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.motor;
        if m.counts_per_rev == 0 {
            return Err(ConfigError::Invalid("counts_per_rev must be > 0"));
        }
        if !m.gear_ratio.is_finite() || m.gear_ratio <= 0.0 {
            return Err(ConfigError::Invalid("gear_ratio must be finite and > 0"));
        }
        if !m.max_rpm.is_finite() || m.max_rpm <= 0.0 {
            return Err(ConfigError::Invalid("max_rpm must be finite and > 0"));
        }
        if m.min_duty >= m.max_duty {
            return Err(ConfigError::Invalid("min_duty must be below max_duty"));
        }
        if !m.stop_threshold_rpm.is_finite() || m.stop_threshold_rpm < 0.0 {
            return Err(ConfigError::Invalid("stop_threshold_rpm must be >= 0"));
        }
        if !(0.0..=1.0).contains(&m.max_brake_scale) || m.max_brake_scale == 0.0 {
            return Err(ConfigError::Invalid("max_brake_scale must be in (0, 1]"));
        }

        let p = &self.pid;
        for (v, name) in [
            (p.kp, "kp must be finite and >= 0"),
            (p.ki, "ki must be finite and >= 0"),
            (p.kd, "kd must be finite and >= 0"),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ConfigError::Invalid(name));
            }
        }
        if !p.max_velocity_rpm.is_finite() || p.max_velocity_rpm <= 0.0 {
            return Err(ConfigError::Invalid("pid max_velocity_rpm must be > 0"));
        }
        if !p.integral_clamp.is_finite() || p.integral_clamp <= 0.0 {
            return Err(ConfigError::Invalid("integral_clamp must be > 0"));
        }

        let w = &self.wall;
        if !w.spring_n_per_m.is_finite() || w.spring_n_per_m <= 0.0 {
            return Err(ConfigError::Invalid("spring_n_per_m must be > 0"));
        }
        if !w.handle_radius_m.is_finite() || w.handle_radius_m <= 0.0 {
            return Err(ConfigError::Invalid("handle_radius_m must be > 0"));
        }
        if !w.torque_constant_nm.is_finite() || w.torque_constant_nm <= 0.0 {
            return Err(ConfigError::Invalid("torque_constant_nm must be > 0"));
        }
        if !w.max_force_n.is_finite() || w.max_force_n <= 0.0 {
            return Err(ConfigError::Invalid("max_force_n must be > 0"));
        }
        if !w.release_deadband_deg.is_finite() || w.release_deadband_deg < 0.0 {
            return Err(ConfigError::Invalid("release_deadband_deg must be >= 0"));
        }
        if !w.vibration_hz.is_finite() || w.vibration_hz < 0.0 {
            return Err(ConfigError::Invalid("vibration_hz must be >= 0"));
        }
        if !(0.0..=1.0).contains(&w.max_duty_frac) || w.max_duty_frac == 0.0 {
            return Err(ConfigError::Invalid("max_duty_frac must be in (0, 1]"));
        }

        if self.control_loop.period_ms == 0 {
            return Err(ConfigError::Invalid("control_loop period_ms must be >= 1"));
        }
        if self.control_loop.velocity_window_ms == 0 {
            return Err(ConfigError::Invalid("velocity_window_ms must be >= 1"));
        }

        let b = &self.bridge;
        if b.baud == 0 {
            return Err(ConfigError::Invalid("baud must be > 0"));
        }
        if b.status_poll_ms == 0 || b.gui_push_ms == 0 || b.tick_ms == 0 {
            return Err(ConfigError::Invalid("bridge periods must be >= 1 ms"));
        }

        let s = &self.safety;
        if s.heartbeat_timeout_ms == 0 {
            return Err(ConfigError::Invalid("heartbeat_timeout_ms must be >= 1"));
        }
        if s.max_consecutive_errors == 0 {
            return Err(ConfigError::Invalid("max_consecutive_errors must be >= 1"));
        }
        if !s.max_velocity_rpm.is_finite() || s.max_velocity_rpm <= 0.0 {
            return Err(ConfigError::Invalid("safety max_velocity_rpm must be > 0"));
        }

        Ok(())
    }
}
