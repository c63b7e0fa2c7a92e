#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Supervisory bridge between the GUI and the motor controller.
//!
//! One single-threaded polling loop multiplexes two byte channels: the
//! serial/in-memory line link to the embedded controller and a TCP socket
//! carrying newline-delimited JSON to at most one GUI client. Structured
//! client commands are translated into the controller's text protocol;
//! controller status lines are parsed and mirrored back as `status_update`
//! messages. A safety supervisor latches emergency stop on explicit
//! command, heartbeat loss, or repeated command errors.

pub mod error;
pub mod protocol;
pub mod run;
pub mod session;
pub mod translate;
pub mod transport;

pub use error::BridgeError;
pub use protocol::{ClientMessage, MotorAction, ServerMessage};
pub use run::run_bridge;
pub use session::Session;
pub use transport::GuiTransport;
