pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Dual H-bridge motor driver seam: one PWM duty channel plus two
/// direction inputs (IN1/IN2). Forward = (high, low), reverse =
/// (low, high), coast = (low, low), short-brake = (high, high).
pub trait HBridge {
    fn set_duty(&mut self, duty: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_direction(
        &mut self,
        in1: bool,
        in2: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Non-blocking, newline-delimited byte link.
///
/// Used for both the embedded command console and the bridge's serial link
/// to the controller. `poll_line` must never block: it returns `Ok(None)`
/// when no complete line is buffered and `Err(_)` when the peer is gone.
pub trait LineLink {
    /// Return the next complete line (without the trailing newline), if any.
    fn poll_line(&mut self) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;
    /// Write one line; a newline terminator is appended by the implementation.
    fn send_line(&mut self, line: &str)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
