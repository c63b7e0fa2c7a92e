//! GUI wire protocol: newline-delimited JSON, tagged by `type`, plus the
//! high-rate `FORCE:<fx>,<fz>,<freqHz>` shorthand that bypasses JSON
//! parsing for low-latency force vector updates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    StatusRequest,
    ModeChange {
        mode: String,
        #[serde(default)]
        skill_level: Option<String>,
    },
    EmergencyStop,
    MotorControl {
        action: MotorAction,
        #[serde(default)]
        value: Option<f32>,
        #[serde(default)]
        delta: Option<f32>,
    },
    ZeroPosition {
        #[serde(default)]
        axis: Option<String>,
    },
    AxisSelect {
        axis: String,
    },
    HapticFeedback {
        /// Activation flag; magnitude above 1 carries a direction hint
        /// (legacy overload, forwarded verbatim to the controller)
        #[serde(default)]
        active: f32,
        #[serde(default)]
        force: f32,
        #[serde(default)]
        freq: Option<f32>,
        #[serde(default, rename = "yield")]
        yield_n: Option<f32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotorAction {
    Forward,
    Reverse,
    Stop,
    Speed,
    Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    StatusUpdate {
        handle_wheel_position: f32,
        mode: String,
        skill_level: String,
        emergency_stop: bool,
        spindle_rpm: f32,
        feed_rate: f32,
        /// Epoch seconds
        timestamp: f64,
    },
}

/// Parse the `FORCE:<fx>,<fz>,<freqHz>` shorthand. Returns `None` for
/// lines that are not shorthand at all; malformed shorthand is an error
/// the caller counts like any other bad command.
pub fn parse_force_line(line: &str) -> Option<Result<(f32, f32, f32), ()>> {
    let rest = line.strip_prefix("FORCE:")?;
    let mut parts = rest.splitn(3, ',');
    let mut next = || -> Result<f32, ()> {
        parts
            .next()
            .ok_or(())?
            .trim()
            .parse::<f32>()
            .map_err(|_| ())
            .and_then(|v| if v.is_finite() { Ok(v) } else { Err(()) })
    };
    Some((|| Ok((next()?, next()?, next()?)))())
}
