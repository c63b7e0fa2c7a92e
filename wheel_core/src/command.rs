//! Line protocol parser.
//!
//! One command per line, case-insensitive keyword plus space-separated
//! arguments. Parsing validates everything once and produces a closed
//! variant type; dispatch in the controller is then exhaustive.
//!
//! The `spring_wall` activation flag carries a legacy overload: a magnitude
//! above 1 smuggles a direction hint (sign gives the side of the wall).
//! That decoding happens here so the wall engagement logic downstream only
//! ever sees a disambiguated `direction_hint`.

use crate::error::CommandError;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Vel(f32),
    Pos(f32),
    Hold,
    SpringWall {
        force_n: f32,
        engage: bool,
        direction_hint: Option<i8>,
        freq_hz: Option<f32>,
        yield_n: Option<f32>,
    },
    Stop,
    Zero,
    Status,
    Pid {
        kp: f32,
        ki: f32,
        kd: f32,
    },
    Haptic(f32),
    Force {
        force_n: f32,
        rpm: f32,
    },
    Raw {
        duty: u16,
        in1: bool,
        in2: bool,
    },
}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let mut tokens = line.split_whitespace();
    let keyword = tokens
        .next()
        .ok_or_else(|| CommandError::Unknown(line.to_owned()))?
        .to_ascii_lowercase();

    match keyword.as_str() {
        "vel" => Ok(Command::Vel(float_arg(&mut tokens, "rpm")?)),
        "pos" => Ok(Command::Pos(float_arg(&mut tokens, "deg")?)),
        "hold" => Ok(Command::Hold),
        "spring_wall" => {
            let force_n = float_arg(&mut tokens, "force")?;
            let flag = float_arg(&mut tokens, "flag")?;
            let freq_hz = opt_float_arg(&mut tokens, "freq")?;
            let yield_n = opt_float_arg(&mut tokens, "yield")?;
            let direction_hint = if flag.abs() > 1.0 {
                Some(if flag < 0.0 { -1 } else { 1 })
            } else {
                None
            };
            Ok(Command::SpringWall {
                force_n,
                engage: flag != 0.0,
                direction_hint,
                freq_hz,
                yield_n,
            })
        }
        "stop" => Ok(Command::Stop),
        "zero" => Ok(Command::Zero),
        "status" => Ok(Command::Status),
        "pid" => Ok(Command::Pid {
            kp: float_arg(&mut tokens, "kp")?,
            ki: float_arg(&mut tokens, "ki")?,
            kd: float_arg(&mut tokens, "kd")?,
        }),
        "haptic" => Ok(Command::Haptic(float_arg(&mut tokens, "fraction")?)),
        "force" => Ok(Command::Force {
            force_n: float_arg(&mut tokens, "force")?,
            rpm: float_arg(&mut tokens, "rpm")?,
        }),
        "raw" => Ok(Command::Raw {
            duty: duty_arg(&mut tokens)?,
            in1: pin_arg(&mut tokens, "in1")?,
            in2: pin_arg(&mut tokens, "in2")?,
        }),
        _ => Err(CommandError::Unknown(line.to_owned())),
    }
}

fn float_arg<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    field: &'static str,
) -> Result<f32, CommandError> {
    let token = tokens
        .next()
        .ok_or_else(|| CommandError::invalid(field, "missing"))?;
    let value: f32 = token
        .parse()
        .map_err(|_| CommandError::invalid(field, token))?;
    if !value.is_finite() {
        return Err(CommandError::invalid(field, token));
    }
    Ok(value)
}

fn opt_float_arg<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    field: &'static str,
) -> Result<Option<f32>, CommandError> {
    match tokens.next() {
        None => Ok(None),
        Some(token) => {
            let value: f32 = token
                .parse()
                .map_err(|_| CommandError::invalid(field, token))?;
            if !value.is_finite() {
                return Err(CommandError::invalid(field, token));
            }
            Ok(Some(value))
        }
    }
}

fn duty_arg<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Result<u16, CommandError> {
    let token = tokens
        .next()
        .ok_or_else(|| CommandError::invalid("duty", "missing"))?;
    token
        .parse()
        .map_err(|_| CommandError::invalid("duty", token))
}

fn pin_arg<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    field: &'static str,
) -> Result<bool, CommandError> {
    let token = tokens
        .next()
        .ok_or_else(|| CommandError::invalid(field, "missing"))?;
    match token {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(CommandError::invalid(field, token)),
    }
}
