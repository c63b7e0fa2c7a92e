#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Embedded control core for the haptic handle wheel (hardware-agnostic).
//!
//! All hardware interactions go through `wheel_traits::HBridge` and
//! `wheel_traits::LineLink`; timing goes through `wheel_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Encoder**: quadrature edge decode into a shared atomic count, plus a
//!   control-side position/velocity tracker (`encoder` module)
//! - **PID**: position loop producing a velocity command (`pid` module)
//! - **Wall**: virtual-wall haptic renderer with the square-root
//!   torque-to-duty map (`wall` module)
//! - **Drive**: signed-speed and brake actuation of the H-bridge (`drive`)
//! - **Commands**: line protocol parser and interpreter (`command`,
//!   `controller`)
//! - **Safety**: emergency-stop latch shared in shape with the bridge
//!   (`supervisor`)
//! - **Loop**: fixed-period scheduler interleaving command intake with one
//!   control step per tick (`runner`)

pub mod command;
pub mod controller;
pub mod conversions;
pub mod drive;
pub mod encoder;
pub mod error;
pub mod mocks;
pub mod pid;
pub mod runner;
pub mod supervisor;
pub mod util;
pub mod wall;

pub use command::Command;
pub use controller::{Controller, Mode};
pub use drive::MotorDrive;
pub use encoder::{EncoderChannels, EncoderTracker};
pub use error::{CommandError, ControlError, Result};
pub use pid::Pid;
pub use supervisor::{LatchReason, Supervisor};
pub use wall::WallState;
