//! Wiring for the two run modes: embedded controller and GUI bridge.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::{Result, WrapErr, eyre};
use wheel_bridge::GuiTransport;
use wheel_config::Config;
use wheel_core::encoder::EncoderChannels;
use wheel_hardware::{MemoryLink, SimulatedHBridge, StdioLink};
use wheel_traits::MonotonicClock;

/// Options resolved from the `bridge` subcommand flags.
pub struct BridgeOpts {
    pub serial_port: Option<String>,
    pub tcp_port: Option<u16>,
    pub sim: bool,
    pub rt: bool,
    pub rt_prio: Option<i32>,
}

const DEFAULT_RT_PRIO: i32 = 10;

/// Run the embedded control loop on stdin/stdout with simulated drive
/// hardware. Exits on EOF, Ctrl-C, or a supervisor latch.
pub fn controller(cfg: Config, shutdown: &Arc<AtomicBool>) -> Result<()> {
    let bridge = SimulatedHBridge::new();
    let link = StdioLink::new();
    let channels = Arc::new(EncoderChannels::new());
    wheel_core::runner::run_controller(
        bridge,
        link,
        channels,
        cfg,
        MonotonicClock::new(),
        shutdown,
    )
    .wrap_err("controller loop failed")
}

/// Run the GUI bridge against either a serial controller link or an
/// in-process simulated controller.
pub fn bridge(mut cfg: Config, opts: BridgeOpts, shutdown: &Arc<AtomicBool>) -> Result<()> {
    if let Some(port) = opts.tcp_port {
        cfg.bridge.tcp_port = port;
    }
    if opts.rt {
        crate::rt::setup_rt(opts.rt_prio.unwrap_or(DEFAULT_RT_PRIO))?;
    }

    let gui = GuiTransport::bind(cfg.bridge.tcp_port).wrap_err("binding GUI socket")?;
    if let Some(port) = gui.local_port() {
        tracing::info!(port, "GUI socket listening");
    }

    if opts.sim {
        return bridge_simulated(cfg, gui, shutdown);
    }

    let device = opts
        .serial_port
        .or_else(|| std::env::var("WHEEL_SERIAL_PORT").ok())
        .or_else(|| cfg.bridge.serial_port.clone())
        .ok_or_else(|| {
            eyre!("no serial port configured; pass --serial-port, set WHEEL_SERIAL_PORT, or use --sim")
        })?;
    bridge_serial(&device, cfg, gui, shutdown)
}

/// Bridge plus an embedded controller in one process, joined by an
/// in-memory link. Useful for demos and GUI development without hardware.
fn bridge_simulated(cfg: Config, gui: GuiTransport, shutdown: &Arc<AtomicBool>) -> Result<()> {
    tracing::info!("running against an in-process simulated controller");
    let (bridge_end, controller_end) = MemoryLink::pair();
    let controller_cfg = cfg.clone();
    let controller_shutdown = Arc::clone(shutdown);
    let handle = std::thread::spawn(move || {
        let hbridge = SimulatedHBridge::new();
        let channels = Arc::new(EncoderChannels::new());
        wheel_core::runner::run_controller(
            hbridge,
            controller_end,
            channels,
            controller_cfg,
            MonotonicClock::new(),
            &controller_shutdown,
        )
    });

    let outcome = wheel_bridge::run_bridge(bridge_end, gui, &cfg, MonotonicClock::new(), shutdown);

    // The controller thread exits on the shared shutdown flag or when the
    // bridge end of the link drops.
    shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
    match handle.join() {
        Ok(result) => result.wrap_err("simulated controller failed")?,
        Err(_) => tracing::error!("simulated controller thread panicked"),
    }
    outcome.wrap_err("bridge loop failed")
}

#[cfg(feature = "hardware")]
fn bridge_serial(
    device: &str,
    cfg: Config,
    gui: GuiTransport,
    shutdown: &Arc<AtomicBool>,
) -> Result<()> {
    use wheel_hardware::serial::SerialLink;
    tracing::info!(device, baud = cfg.bridge.baud, "opening controller serial link");
    let link = SerialLink::open(device, cfg.bridge.baud)
        .wrap_err_with(|| format!("opening serial device {device}"))?;
    wheel_bridge::run_bridge(link, gui, &cfg, MonotonicClock::new(), shutdown)
        .wrap_err("bridge loop failed")
}

#[cfg(not(feature = "hardware"))]
fn bridge_serial(
    device: &str,
    _cfg: Config,
    _gui: GuiTransport,
    _shutdown: &Arc<AtomicBool>,
) -> Result<()> {
    Err(eyre!(
        "serial device {device} requested but this binary was built without the \
         `hardware` feature; rebuild with --features hardware or use --sim"
    ))
}
