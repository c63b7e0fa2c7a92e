//! Per-process bridge session state: mode/skill mirrors, cached controller
//! telemetry, axis selection, and the stored target speed for directional
//! motor commands.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Z,
}

impl Axis {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Some(Self::X),
            "z" => Some(Self::Z),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub mode: String,
    pub skill_level: String,
    pub emergency_stop: bool,
    /// Last handle position parsed from a controller status line (degrees)
    pub last_position_deg: f32,
    /// Last handle velocity parsed from a controller status line (RPM)
    pub last_velocity_rpm: f32,
    pub active_axis: Axis,
    /// Speed used by forward/reverse commands until a `speed` update (RPM)
    pub target_speed_rpm: f32,
    pub spindle_rpm: f32,
    pub feed_rate: f32,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            mode: "idle".to_owned(),
            skill_level: "beginner".to_owned(),
            emergency_stop: false,
            last_position_deg: 0.0,
            last_velocity_rpm: 0.0,
            active_axis: Axis::X,
            target_speed_rpm: 50.0,
            spindle_rpm: 0.0,
            feed_rate: 0.0,
        }
    }
}

/// Fields extracted from a controller status line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatus {
    pub position_deg: f32,
    pub velocity_rpm: f32,
    pub mode: String,
}

/// Parse `Position: <deg> degrees, Velocity: <rpm> RPM, Mode: <mode>[, ...]`.
/// Returns `None` for non-status controller output (OK/ERROR replies).
pub fn parse_status_line(line: &str) -> Option<ParsedStatus> {
    let rest = line.strip_prefix("Position: ")?;
    let (deg_str, rest) = rest.split_once(" degrees, Velocity: ")?;
    let (rpm_str, rest) = rest.split_once(" RPM, Mode: ")?;
    let mode = rest.split(',').next()?.trim();
    Some(ParsedStatus {
        position_deg: deg_str.trim().parse().ok()?,
        velocity_rpm: rpm_str.trim().parse().ok()?,
        mode: mode.to_owned(),
    })
}

impl Session {
    /// Fold fresh controller telemetry into the session cache.
    pub fn absorb_status(&mut self, status: &ParsedStatus) {
        self.last_position_deg = status.position_deg;
        self.last_velocity_rpm = status.velocity_rpm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_status_line() {
        let s =
            parse_status_line("Position: 45.00 degrees, Velocity: -12.50 RPM, Mode: velocity")
                .unwrap();
        assert_eq!(
            s,
            ParsedStatus {
                position_deg: 45.0,
                velocity_rpm: -12.5,
                mode: "velocity".into()
            }
        );
    }

    #[test]
    fn parses_status_line_with_wall_suffix() {
        let line = "Position: 91.25 degrees, Velocity: 0.00 RPM, Mode: virtual_wall, \
                    Wall @ 90.00\u{b0}, dir=+1, force=20.0N";
        let s = parse_status_line(line).unwrap();
        assert_eq!(s.mode, "virtual_wall");
        assert!((s.position_deg - 91.25).abs() < 1e-6);
    }

    #[test]
    fn replies_are_not_status() {
        assert_eq!(parse_status_line("OK: stopped"), None);
        assert_eq!(parse_status_line("ERROR: Unknown command: warp"), None);
    }

    #[test]
    fn axis_parse_is_case_insensitive() {
        assert_eq!(Axis::parse("X"), Some(Axis::X));
        assert_eq!(Axis::parse("z"), Some(Axis::Z));
        assert_eq!(Axis::parse("y"), None);
    }
}
