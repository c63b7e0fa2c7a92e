//! GUI command → controller text command translation.
//!
//! The controller only speaks the line protocol; everything structured is
//! reduced to one text command here. Session mirrors (mode, skill level,
//! stored target speed, active axis) are updated as a side effect.

use crate::protocol::{ClientMessage, MotorAction};
use crate::session::{Axis, Session};

/// What the bridge loop should do with one client command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Send this line to the controller
    Command(String),
    /// Reply to the client with a status update now
    PushStatus,
    /// Latch the safety supervisor (it issues the stop once)
    EmergencyStop,
    /// Session-only update, nothing on either wire
    Updated,
    /// Structurally valid JSON but semantically unusable
    Invalid(&'static str),
}

pub fn translate(msg: ClientMessage, session: &mut Session) -> Outcome {
    match msg {
        ClientMessage::StatusRequest => Outcome::PushStatus,
        ClientMessage::ModeChange { mode, skill_level } => {
            session.mode = mode;
            if let Some(level) = skill_level {
                session.skill_level = level;
            }
            Outcome::PushStatus
        }
        ClientMessage::EmergencyStop => Outcome::EmergencyStop,
        ClientMessage::MotorControl {
            action,
            value,
            delta,
        } => translate_motor(action, value, delta, session),
        ClientMessage::ZeroPosition { axis } => {
            let forwards = match axis.as_deref() {
                None => true,
                Some(a) if a.eq_ignore_ascii_case("all") => true,
                Some(a) => Axis::parse(a) == Some(session.active_axis),
            };
            if forwards {
                Outcome::Command("zero".to_owned())
            } else {
                Outcome::Updated
            }
        }
        ClientMessage::AxisSelect { axis } => match Axis::parse(&axis) {
            Some(a) => {
                session.active_axis = a;
                Outcome::Updated
            }
            None => Outcome::Invalid("unknown axis"),
        },
        ClientMessage::HapticFeedback {
            active,
            force,
            freq,
            yield_n,
        } => {
            if active == 0.0 || force <= 0.0 {
                return Outcome::Command("spring_wall 0 0".to_owned());
            }
            // The activation flag is forwarded verbatim so the magnitude-2
            // direction-hint overload survives the hop.
            let mut line = format!("spring_wall {force} {active}");
            if let Some(f) = freq {
                line.push_str(&format!(" {f}"));
                if let Some(y) = yield_n {
                    line.push_str(&format!(" {y}"));
                }
            }
            Outcome::Command(line)
        }
    }
}

fn translate_motor(
    action: MotorAction,
    value: Option<f32>,
    delta: Option<f32>,
    session: &mut Session,
) -> Outcome {
    match action {
        MotorAction::Forward => Outcome::Command(format!("vel {:.2}", session.target_speed_rpm)),
        MotorAction::Reverse => Outcome::Command(format!("vel {:.2}", -session.target_speed_rpm)),
        MotorAction::Stop => Outcome::Command("stop".to_owned()),
        MotorAction::Speed => match value {
            Some(v) if v.is_finite() && v >= 0.0 => {
                session.target_speed_rpm = v;
                Outcome::Updated
            }
            _ => Outcome::Invalid("speed requires a non-negative value"),
        },
        MotorAction::Position => match delta {
            Some(d) if d.is_finite() => {
                Outcome::Command(format!("pos {:.2}", session.last_position_deg + d))
            }
            _ => Outcome::Invalid("position requires a delta"),
        },
    }
}

/// Translate one FORCE shorthand vector. The active-axis component picks
/// the force magnitude; its sign rides as a flag of magnitude 2, the
/// legacy direction-hint encoding.
pub fn translate_force(fx: f32, fz: f32, freq_hz: f32, session: &Session) -> Outcome {
    let component = match session.active_axis {
        Axis::X => fx,
        Axis::Z => fz,
    };
    if component == 0.0 {
        return Outcome::Command("spring_wall 0 0".to_owned());
    }
    let flag: f32 = if component < 0.0 { -2.0 } else { 2.0 };
    let magnitude = component.abs();
    if freq_hz > 0.0 {
        Outcome::Command(format!("spring_wall {magnitude} {flag} {freq_hz}"))
    } else {
        Outcome::Command(format!("spring_wall {magnitude} {flag}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn msg(json: &str) -> ClientMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn status_request_pushes() {
        let mut s = Session::default();
        assert_eq!(
            translate(msg(r#"{"type":"status_request"}"#), &mut s),
            Outcome::PushStatus
        );
    }

    #[test]
    fn mode_change_mirrors_into_session() {
        let mut s = Session::default();
        let out = translate(
            msg(r#"{"type":"mode_change","mode":"practice","skill_level":"expert"}"#),
            &mut s,
        );
        assert_eq!(out, Outcome::PushStatus);
        assert_eq!(s.mode, "practice");
        assert_eq!(s.skill_level, "expert");
    }

    #[test]
    fn forward_reverse_use_stored_speed() {
        let mut s = Session::default();
        let out = translate(
            msg(r#"{"type":"motor_control","action":"speed","value":75.0}"#),
            &mut s,
        );
        assert_eq!(out, Outcome::Updated);
        assert_eq!(
            translate(msg(r#"{"type":"motor_control","action":"forward"}"#), &mut s),
            Outcome::Command("vel 75.00".into())
        );
        assert_eq!(
            translate(msg(r#"{"type":"motor_control","action":"reverse"}"#), &mut s),
            Outcome::Command("vel -75.00".into())
        );
    }

    #[test]
    fn position_applies_relative_delta() {
        let mut s = Session {
            last_position_deg: 30.0,
            ..Session::default()
        };
        assert_eq!(
            translate(
                msg(r#"{"type":"motor_control","action":"position","delta":-5.0}"#),
                &mut s
            ),
            Outcome::Command("pos 25.00".into())
        );
        assert!(matches!(
            translate(msg(r#"{"type":"motor_control","action":"position"}"#), &mut s),
            Outcome::Invalid(_)
        ));
    }

    #[rstest]
    #[case(r#"{"type":"zero_position"}"#, true)]
    #[case(r#"{"type":"zero_position","axis":"all"}"#, true)]
    #[case(r#"{"type":"zero_position","axis":"x"}"#, true)]
    #[case(r#"{"type":"zero_position","axis":"z"}"#, false)]
    fn zero_forwards_only_for_active_axis(#[case] json: &str, #[case] forwards: bool) {
        let mut s = Session::default(); // active axis X
        let out = translate(msg(json), &mut s);
        if forwards {
            assert_eq!(out, Outcome::Command("zero".into()));
        } else {
            assert_eq!(out, Outcome::Updated);
        }
    }

    #[test]
    fn haptic_feedback_forwards_flag_verbatim() {
        let mut s = Session::default();
        let out = translate(
            msg(r#"{"type":"haptic_feedback","active":-2.0,"force":15.0,"freq":30.0,"yield":5.0}"#),
            &mut s,
        );
        assert_eq!(out, Outcome::Command("spring_wall 15 -2 30 5".into()));
        let out = translate(
            msg(r#"{"type":"haptic_feedback","active":0.0,"force":15.0}"#),
            &mut s,
        );
        assert_eq!(out, Outcome::Command("spring_wall 0 0".into()));
    }

    #[test]
    fn force_shorthand_picks_active_axis_and_encodes_hint() {
        let mut s = Session::default();
        assert_eq!(
            translate_force(10.0, -3.0, 25.0, &s),
            Outcome::Command("spring_wall 10 2 25".into())
        );
        s.active_axis = Axis::Z;
        assert_eq!(
            translate_force(10.0, -3.0, 25.0, &s),
            Outcome::Command("spring_wall 3 -2 25".into())
        );
        assert_eq!(
            translate_force(10.0, 0.0, 25.0, &s),
            Outcome::Command("spring_wall 0 0".into())
        );
    }

    #[test]
    fn emergency_stop_is_surfaced_not_translated() {
        let mut s = Session::default();
        assert_eq!(
            translate(msg(r#"{"type":"emergency_stop"}"#), &mut s),
            Outcome::EmergencyStop
        );
    }
}
