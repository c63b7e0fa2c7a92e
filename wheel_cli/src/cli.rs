//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "wheel",
    version,
    about = "Haptic handle-wheel controller and GUI bridge"
)]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/wheel.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the embedded control loop with simulated drive hardware,
    /// taking text commands on stdin and replying on stdout
    Controller,
    /// Run the GUI bridge
    Bridge {
        /// Serial device for the controller link (overrides config and
        /// the WHEEL_SERIAL_PORT environment variable)
        #[arg(long, value_name = "DEV")]
        serial_port: Option<String>,

        /// TCP port for the GUI socket (overrides config)
        #[arg(long, value_name = "PORT")]
        tcp_port: Option<u16>,

        /// Loop back to an in-process simulated controller instead of a
        /// serial link
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,

        /// Enable real-time mode for the bridge loop (Linux: SCHED_FIFO
        /// and mlockall; may require elevated privileges)
        #[arg(long, action = ArgAction::SetTrue)]
        rt: bool,

        /// SCHED_FIFO priority when --rt is enabled (Linux only)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
    },
}
