//! Fixed-period embedded control loop.
//!
//! Once per period: drain every pending command line without blocking,
//! applying each in order and replying per line, then run exactly one
//! control step. Neither side can starve the other and the loop never
//! waits on I/O. Exits when the command port reports closed, the
//! supervisor latches, or the shutdown flag is raised.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use wheel_config::Config;
use wheel_traits::{Clock, HBridge, LineLink};

use crate::command;
use crate::controller::Controller;
use crate::encoder::EncoderChannels;
use crate::error::Result;
use crate::supervisor::Supervisor;

pub fn run_controller<B, L, C>(
    bridge: B,
    mut link: L,
    channels: Arc<EncoderChannels>,
    cfg: Config,
    clock: C,
    shutdown: &AtomicBool,
) -> Result<()>
where
    B: HBridge,
    L: LineLink,
    C: Clock + Clone,
{
    let period = Duration::from_millis(cfg.control_loop.period_ms);
    let mut supervisor = Supervisor::new(&cfg.safety);
    let mut controller = Controller::new(cfg, bridge, channels, clock.clone());
    tracing::info!(period_ms = period.as_millis() as u64, "control loop start");

    while !shutdown.load(Ordering::Relaxed) {
        let tick_start = clock.now();

        loop {
            match link.poll_line() {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    supervisor.heartbeat(clock.now());
                    match command::parse(trimmed) {
                        Ok(cmd) => {
                            supervisor.record_success();
                            let reply = controller.apply(cmd)?;
                            send_best_effort(&mut link, &reply);
                        }
                        Err(e) => {
                            supervisor.record_error();
                            send_best_effort(&mut link, &format!("ERROR: {e}"));
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::info!(error = %e, "command port closed, stopping");
                    controller.stop().wrap_err("stopping drive on port close")?;
                    return Ok(());
                }
            }
        }

        supervisor.check(clock.now());
        if let Some(reason) = supervisor.take_latch_event() {
            tracing::error!(%reason, "supervisor latched, stopping drive");
            controller.stop().wrap_err("stopping drive on latch")?;
        }
        if supervisor.is_latched() {
            return Ok(());
        }

        controller.tick()?;

        let elapsed = clock.now().saturating_duration_since(tick_start);
        if elapsed < period {
            clock.sleep(period - elapsed);
        }
    }

    controller.stop().wrap_err("stopping drive on shutdown")?;
    tracing::info!("control loop exit");
    Ok(())
}

fn send_best_effort<L: LineLink>(link: &mut L, line: &str) {
    if let Err(e) = link.send_line(line) {
        tracing::warn!(error = %e, "reply send failed");
    }
}
