//! The bridge polling loop.
//!
//! Single-threaded and cooperative: one iteration accepts/reads the GUI
//! socket, applies the last valid client command (last-writer-wins inside
//! an iteration, bounding latency under bursty input), drains controller
//! telemetry, evaluates the safety supervisor, polls controller status on
//! a fast period, and pushes a status update to the client. An emergency
//! stop in the burst latches immediately; the supersede policy only covers
//! ordinary commands. Pushes fire immediately when fresh controller data
//! arrived; the periodic push is only a fallback heartbeat.
//!
//! Controller-link faults are not fatal: writes are fire-and-forget with a
//! warning and reads degrade to "peer absent" until traffic resumes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use eyre::WrapErr;
use wheel_config::Config;
use wheel_core::supervisor::Supervisor;
use wheel_traits::{Clock, LineLink};

use crate::error::Result;
use crate::protocol::{self, ClientMessage, ServerMessage};
use crate::session::{self, Session};
use crate::translate::{self, Outcome};
use crate::transport::GuiTransport;

pub fn run_bridge<L, C>(
    mut controller: L,
    mut gui: GuiTransport,
    cfg: &Config,
    clock: C,
    shutdown: &AtomicBool,
) -> Result<()>
where
    L: LineLink,
    C: Clock,
{
    let tick = Duration::from_millis(cfg.bridge.tick_ms);
    let poll_period = Duration::from_millis(cfg.bridge.status_poll_ms);
    let push_period = Duration::from_millis(cfg.bridge.gui_push_ms);

    let mut session = Session::default();
    let mut supervisor = Supervisor::new(&cfg.safety);
    let mut last_poll: Option<Instant> = None;
    let mut last_push: Option<Instant> = None;
    let mut controller_down = false;

    tracing::info!(
        tick_ms = cfg.bridge.tick_ms,
        poll_ms = cfg.bridge.status_poll_ms,
        push_ms = cfg.bridge.gui_push_ms,
        "bridge loop start"
    );

    while !shutdown.load(Ordering::Relaxed) {
        let tick_start = clock.now();

        if gui.poll_accept() {
            supervisor.heartbeat(tick_start);
        }

        // Client intake: any traffic is a heartbeat. An emergency stop
        // latches the moment it is read; only the remaining command kinds
        // compete for the last-valid slot.
        let mut last_valid: Option<Outcome> = None;
        for line in gui.read_lines() {
            supervisor.heartbeat(clock.now());
            match interpret_client_line(&line, &mut session) {
                Ok(Outcome::EmergencyStop) => {
                    supervisor.record_success();
                    supervisor.trip_emergency_stop();
                }
                Ok(outcome) => {
                    supervisor.record_success();
                    last_valid = Some(outcome);
                }
                Err(why) => {
                    supervisor.record_error();
                    tracing::warn!(line, why, "bad client command");
                }
            }
        }

        let mut push_now = false;
        match last_valid {
            Some(Outcome::Command(cmd)) => {
                if supervisor.is_latched() {
                    tracing::warn!(cmd, "dropping motor command, emergency stop latched");
                } else if !send_command(&mut controller, &cmd) {
                    supervisor.record_error();
                }
            }
            Some(Outcome::PushStatus) => push_now = true,
            Some(Outcome::EmergencyStop | Outcome::Updated | Outcome::Invalid(_)) | None => {}
        }

        // Controller telemetry. A read fault means the peer is absent for
        // now; keep looping so a reconnect resumes where it left off.
        let mut fresh = false;
        loop {
            match controller.poll_line() {
                Ok(Some(line)) => {
                    controller_down = false;
                    if let Some(status) = session::parse_status_line(&line) {
                        if supervisor.velocity_exceeded(status.velocity_rpm)
                            && !supervisor.is_latched()
                        {
                            // Soft violation: correct, do not latch.
                            tracing::warn!(
                                velocity = status.velocity_rpm,
                                "velocity limit exceeded, reissuing stop"
                            );
                            if !send_command(&mut controller, "stop") {
                                supervisor.record_error();
                            }
                        }
                        session.absorb_status(&status);
                        fresh = true;
                    } else {
                        tracing::debug!(reply = line, "controller reply");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    if !controller_down {
                        tracing::warn!(error = %e, "controller link down, polling for return");
                        controller_down = true;
                    }
                    break;
                }
            }
        }

        supervisor.check(clock.now());
        if let Some(reason) = supervisor.take_latch_event() {
            session.emergency_stop = true;
            tracing::error!(%reason, "emergency stop, halting motor");
            let _ = send_command(&mut controller, "stop");
            push_now = true;
        }

        if due(&mut last_poll, clock.now(), poll_period) {
            let _ = send_command(&mut controller, "status");
        }

        if gui.has_client() && (push_now || fresh || is_due(last_push, clock.now(), push_period)) {
            let update = status_update(&session);
            let json = serde_json::to_string(&update).wrap_err("encoding status update")?;
            gui.send_line(&json);
            last_push = Some(clock.now());
        }

        let elapsed = clock.now().saturating_duration_since(tick_start);
        if elapsed < tick {
            clock.sleep(tick - elapsed);
        }
    }

    tracing::info!("bridge loop exit");
    Ok(())
}

fn interpret_client_line(line: &str, session: &mut Session) -> std::result::Result<Outcome, String> {
    if let Some(parsed) = protocol::parse_force_line(line) {
        return match parsed {
            Ok((fx, fz, freq)) => Ok(translate::translate_force(fx, fz, freq, session)),
            Err(()) => Err("malformed FORCE line".to_owned()),
        };
    }
    match serde_json::from_str::<ClientMessage>(line) {
        Ok(msg) => match translate::translate(msg, session) {
            Outcome::Invalid(why) => Err(why.to_owned()),
            outcome => Ok(outcome),
        },
        Err(e) => Err(e.to_string()),
    }
}

/// Fire-and-forget controller write; failure is logged and reported back,
/// never fatal to the loop.
fn send_command<L: LineLink>(controller: &mut L, cmd: &str) -> bool {
    match controller.send_line(cmd) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(cmd, error = %e, "controller write failed");
            false
        }
    }
}

fn status_update(session: &Session) -> ServerMessage {
    ServerMessage::StatusUpdate {
        handle_wheel_position: session.last_position_deg,
        mode: session.mode.clone(),
        skill_level: session.skill_level.clone(),
        emergency_stop: session.emergency_stop,
        spindle_rpm: session.spindle_rpm,
        feed_rate: session.feed_rate,
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0),
    }
}

/// True when `period` has elapsed since the stored instant (or it was never
/// set); updates the instant when due.
fn due(last: &mut Option<Instant>, now: Instant, period: Duration) -> bool {
    if is_due(*last, now, period) {
        *last = Some(now);
        true
    } else {
        false
    }
}

fn is_due(last: Option<Instant>, now: Instant, period: Duration) -> bool {
    match last {
        None => true,
        Some(t) => now.saturating_duration_since(t) >= period,
    }
}
