//! Test and helper mocks for wheel_core.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use wheel_traits::{HBridge, LineLink};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Last actuation applied to a `SpyBridge`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DriveSnapshot {
    pub duty: u16,
    pub in1: bool,
    pub in2: bool,
}

/// Shared read handle onto a `SpyBridge`'s state.
#[derive(Debug, Clone)]
pub struct DriveProbe(Arc<Mutex<DriveSnapshot>>);

impl DriveProbe {
    pub fn snapshot(&self) -> DriveSnapshot {
        self.0.lock().map(|s| *s).unwrap_or_default()
    }
}

/// H-bridge that records the last duty and direction lines.
#[derive(Debug)]
pub struct SpyBridge {
    state: Arc<Mutex<DriveSnapshot>>,
}

impl SpyBridge {
    pub fn new() -> (Self, DriveProbe) {
        let state = Arc::new(Mutex::new(DriveSnapshot::default()));
        let probe = DriveProbe(Arc::clone(&state));
        (Self { state }, probe)
    }
}

impl HBridge for SpyBridge {
    fn set_duty(&mut self, duty: u16) -> Result<(), BoxError> {
        if let Ok(mut s) = self.state.lock() {
            s.duty = duty;
        }
        Ok(())
    }

    fn set_direction(&mut self, in1: bool, in2: bool) -> Result<(), BoxError> {
        if let Ok(mut s) = self.state.lock() {
            s.in1 = in1;
            s.in2 = in2;
        }
        Ok(())
    }
}

/// H-bridge that always fails; for exercising hardware error paths.
pub struct FailingBridge;

impl HBridge for FailingBridge {
    fn set_duty(&mut self, _duty: u16) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other("bridge fault")))
    }

    fn set_direction(&mut self, _in1: bool, _in2: bool) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other("bridge fault")))
    }
}

/// Scripted command link: yields queued lines, then `Ok(None)` forever, or
/// an error once drained when `close_when_drained` is set. Sent replies are
/// captured for assertions.
pub struct ScriptLink {
    incoming: VecDeque<String>,
    close_when_drained: bool,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ScriptLink {
    pub fn new<I, S>(lines: I, close_when_drained: bool) -> (Self, Arc<Mutex<Vec<String>>>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                incoming: lines.into_iter().map(Into::into).collect(),
                close_when_drained,
                sent: Arc::clone(&sent),
            },
            sent,
        )
    }
}

impl LineLink for ScriptLink {
    fn poll_line(&mut self) -> Result<Option<String>, BoxError> {
        match self.incoming.pop_front() {
            Some(line) => Ok(Some(line)),
            None if self.close_when_drained => {
                Err(Box::new(std::io::Error::other("peer closed")))
            }
            None => Ok(None),
        }
    }

    fn send_line(&mut self, line: &str) -> Result<(), BoxError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(line.to_owned());
        }
        Ok(())
    }
}
