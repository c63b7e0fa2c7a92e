//! Command interpreter and per-tick control dispatch.
//!
//! The controller owns the encoder tracker, the PID, the drive stage and
//! the current mode; it is the single writer of control state. Commands
//! arrive as parsed `Command` values and are applied one at a time; `tick`
//! runs exactly one control-mode step.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use wheel_config::Config;
use wheel_traits::{Clock, HBridge};

use crate::command::{self, Command};
use crate::conversions;
use crate::drive::MotorDrive;
use crate::encoder::{EncoderChannels, EncoderTracker};
use crate::error::ControlError;
use crate::pid::Pid;
use crate::util;
use crate::wall::{self, WallState};

/// Control mode; each variant carries only the data it needs, so invalid
/// mode/target combinations cannot be represented.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Idle,
    Velocity { target_rpm: f32 },
    Position { target_deg: f32 },
    VirtualWall(WallState),
    Raw,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Velocity { .. } => "velocity",
            Self::Position { .. } => "position",
            Self::VirtualWall(_) => "virtual_wall",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct Controller<B: HBridge, C: Clock> {
    cfg: Config,
    clock: C,
    epoch: Instant,
    tracker: EncoderTracker,
    pid: Pid,
    drive: MotorDrive<B>,
    mode: Mode,
    /// Nonzero requested force for force-assist velocity drive
    force_assist_n: Option<f32>,
    dt_s: f32,
}

impl<B: HBridge, C: Clock> Controller<B, C> {
    pub fn new(cfg: Config, bridge: B, channels: Arc<EncoderChannels>, clock: C) -> Self {
        let epoch = clock.now();
        let tracker = EncoderTracker::new(
            channels,
            cfg.motor.counts_per_output_rev(),
            Duration::from_millis(cfg.control_loop.velocity_window_ms),
            epoch,
        );
        let pid = Pid::new(&cfg.pid);
        let drive = MotorDrive::new(bridge, cfg.motor.clone());
        let dt_s = util::dt_secs(cfg.control_loop.period_ms);
        Self {
            cfg,
            clock,
            epoch,
            tracker,
            pid,
            drive,
            mode: Mode::Idle,
            force_assist_n: None,
            dt_s,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Parse and apply one line. Blank lines get no reply; parse failures
    /// become `ERROR:` replies without touching control state.
    pub fn handle_line(&mut self, line: &str) -> Result<Option<String>, ControlError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        match command::parse(trimmed) {
            Ok(cmd) => self.apply(cmd).map(Some),
            Err(e) => Ok(Some(format!("ERROR: {e}"))),
        }
    }

    /// Apply one parsed command, returning the reply line.
    pub fn apply(&mut self, cmd: Command) -> Result<String, ControlError> {
        let now = self.clock.now();
        match cmd {
            Command::Vel(rpm) => {
                self.force_assist_n = None;
                self.mode = Mode::Velocity { target_rpm: rpm };
                tracing::debug!(rpm, "velocity target");
                Ok(format!("OK: velocity target {rpm:.2} RPM"))
            }
            Command::Pos(deg) => {
                self.force_assist_n = None;
                self.pid.reset();
                self.mode = Mode::Position { target_deg: deg };
                tracing::debug!(deg, "position target");
                Ok(format!("OK: position target {deg:.2} degrees"))
            }
            Command::Hold => {
                let deg = self.tracker.position_degrees();
                self.force_assist_n = None;
                self.pid.reset();
                self.mode = Mode::Position { target_deg: deg };
                Ok(format!("OK: holding {deg:.2} degrees"))
            }
            Command::SpringWall {
                force_n,
                engage,
                direction_hint,
                freq_hz,
                yield_n,
            } => self.apply_spring_wall(force_n, engage, direction_hint, freq_hz, yield_n, now),
            Command::Stop => {
                self.stop()?;
                Ok("OK: stopped".to_owned())
            }
            Command::Zero => {
                self.tracker.zero(now);
                self.pid.reset();
                Ok("OK: position zeroed".to_owned())
            }
            Command::Status => Ok(self.status_line(now)),
            Command::Pid { kp, ki, kd } => {
                self.pid.set_gains(kp, ki, kd);
                Ok(format!("OK: gains kp={kp} ki={ki} kd={kd}"))
            }
            Command::Haptic(fraction) => {
                let level = fraction.clamp(0.0, 1.0);
                self.drive.set_brake_level(level);
                Ok(format!("OK: haptic level {level:.2}"))
            }
            Command::Force { force_n, rpm } => {
                self.force_assist_n =
                    (force_n > 0.0).then(|| wall::clamp_force(force_n, &self.cfg.wall));
                self.mode = Mode::Velocity { target_rpm: rpm };
                Ok(format!("OK: force {force_n:.1}N @ {rpm:.2} RPM"))
            }
            Command::Raw { duty, in1, in2 } => {
                self.mode = Mode::Raw;
                self.drive.raw(duty, in1, in2)?;
                Ok(format!("OK: raw duty={duty} in1={} in2={}", u8::from(in1), u8::from(in2)))
            }
        }
    }

    fn apply_spring_wall(
        &mut self,
        force_n: f32,
        engage: bool,
        direction_hint: Option<i8>,
        freq_hz: Option<f32>,
        yield_n: Option<f32>,
        now: Instant,
    ) -> Result<String, ControlError> {
        if !engage || force_n <= 0.0 {
            if matches!(self.mode, Mode::VirtualWall(_)) {
                self.mode = Mode::Idle;
                self.drive.coast()?;
                tracing::info!("wall released");
            }
            return Ok("OK: wall released".to_owned());
        }

        let force = wall::clamp_force(force_n, &self.cfg.wall);
        let freq = freq_hz.unwrap_or(self.cfg.wall.vibration_hz);
        let yield_force = yield_n.unwrap_or(0.0);

        // Already engaged: update parameters, keep the captured contact
        // angle (no recapture while engaged).
        if let Mode::VirtualWall(ws) = &mut self.mode {
            ws.force_n = force;
            ws.vibration_hz = freq;
            ws.yield_force_n = yield_force;
            if let Some(hint) = direction_hint {
                ws.direction = hint;
            }
            return Ok(format!("OK: wall updated, force={force:.1}N"));
        }

        let velocity = self.tracker.velocity_rpm(now);
        let direction =
            wall::resolve_direction(direction_hint, velocity, self.tracker.last_motion_dir());
        let contact = self.tracker.position_degrees();
        self.mode = Mode::VirtualWall(WallState {
            contact_angle_deg: contact,
            direction,
            force_n: force,
            vibration_hz: freq,
            yield_force_n: yield_force,
        });
        tracing::info!(contact, direction, force, "wall engaged");
        Ok(format!(
            "OK: wall engaged @ {contact:.2} degrees, dir={direction:+}, force={force:.1}N"
        ))
    }

    /// Fail-safe stop: zero the output stage, drop targets and wall state,
    /// return to Idle. The haptic brake level is left alone; it is a
    /// passive resistance setting, not a drive command.
    pub fn stop(&mut self) -> Result<(), ControlError> {
        self.drive.stop()?;
        self.force_assist_n = None;
        self.mode = Mode::Idle;
        Ok(())
    }

    /// One control step for the current mode.
    pub fn tick(&mut self) -> Result<(), ControlError> {
        let mode = self.mode.clone();
        match mode {
            Mode::Idle => self.drive.drive_rpm(0.0),
            Mode::Raw => Ok(()),
            Mode::Velocity { target_rpm } => {
                if let Some(force_n) = self.force_assist_n {
                    let direction = util::sign_i8(target_rpm);
                    let torque = conversions::motor_torque_from_force(
                        force_n,
                        self.cfg.wall.handle_radius_m,
                        self.cfg.motor.gear_ratio,
                    );
                    let frac = conversions::duty_fraction_from_torque(
                        torque,
                        self.cfg.wall.torque_constant_nm,
                    )
                    .min(self.cfg.wall.max_duty_frac);
                    self.drive.drive_duty(direction, frac)
                } else {
                    self.drive.drive_rpm(target_rpm)
                }
            }
            Mode::Position { target_deg } => {
                let position = self.tracker.position_degrees();
                let command_rpm = self.pid.step(target_deg - position, self.dt_s);
                self.drive.drive_rpm(command_rpm)
            }
            Mode::VirtualWall(ws) => {
                let position = self.tracker.position_degrees();
                let t_wall_s = self
                    .clock
                    .now()
                    .saturating_duration_since(self.epoch)
                    .as_secs_f32();
                let out = wall::render(&ws, &self.cfg.wall, &self.cfg.motor, position, t_wall_s);
                self.drive.drive_mapped(out.direction, out.duty)
            }
        }
    }

    fn status_line(&mut self, now: Instant) -> String {
        let position = self.tracker.position_degrees();
        let velocity = self.tracker.velocity_rpm(now);
        let mut line = format!(
            "Position: {position:.2} degrees, Velocity: {velocity:.2} RPM, Mode: {}",
            self.mode
        );
        if let Mode::VirtualWall(ws) = &self.mode {
            line.push_str(&format!(
                ", Wall @ {:.2}\u{b0}, dir={:+}, force={:.1}N",
                ws.contact_angle_deg, ws.direction, ws.force_n
            ));
        }
        line
    }
}
