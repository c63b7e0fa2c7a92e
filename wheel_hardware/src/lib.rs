#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Hardware backends for the handle-wheel controller.
//!
//! Simulated implementations ship by default; the `hardware` feature adds a
//! `serialport`-backed `LineLink` for the bridge↔controller link.

pub mod error;
#[cfg(feature = "hardware")]
pub mod serial;

use std::collections::VecDeque;
use std::io::Write;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use wheel_traits::{HBridge, LineLink};

use crate::error::HwError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Simulated H-bridge: records the driver state in shared cells so demos
/// and tests can observe what the control loop commanded.
pub struct SimulatedHBridge {
    duty: Rc<std::cell::Cell<u16>>,
    pins: Rc<std::cell::Cell<(bool, bool)>>,
}

impl SimulatedHBridge {
    pub fn new() -> Self {
        Self {
            duty: Rc::new(std::cell::Cell::new(0)),
            pins: Rc::new(std::cell::Cell::new((false, false))),
        }
    }

    pub fn duty_handle(&self) -> Rc<std::cell::Cell<u16>> {
        Rc::clone(&self.duty)
    }

    pub fn pins_handle(&self) -> Rc<std::cell::Cell<(bool, bool)>> {
        Rc::clone(&self.pins)
    }
}

impl Default for SimulatedHBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl HBridge for SimulatedHBridge {
    fn set_duty(&mut self, duty: u16) -> Result<(), BoxError> {
        self.duty.set(duty);
        tracing::trace!(duty, "simulated duty");
        Ok(())
    }

    fn set_direction(&mut self, in1: bool, in2: bool) -> Result<(), BoxError> {
        self.pins.set((in1, in2));
        tracing::trace!(in1, in2, "simulated direction");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    A,
    B,
}

#[derive(Debug, Default)]
struct MemoryShared {
    a_inbox: VecDeque<String>,
    b_inbox: VecDeque<String>,
    closed: bool,
}

/// One side of an in-memory duplex line link; lines sent on one end appear
/// on the other. Closing either end makes both report disconnection once
/// their inbox drains.
pub struct MemoryLink {
    shared: Arc<Mutex<MemoryShared>>,
    end: End,
}

impl MemoryLink {
    pub fn pair() -> (Self, Self) {
        let shared = Arc::new(Mutex::new(MemoryShared::default()));
        (
            Self {
                shared: Arc::clone(&shared),
                end: End::A,
            },
            Self {
                shared,
                end: End::B,
            },
        )
    }

    pub fn close(&self) {
        if let Ok(mut s) = self.shared.lock() {
            s.closed = true;
        }
    }
}

impl LineLink for MemoryLink {
    fn poll_line(&mut self) -> Result<Option<String>, BoxError> {
        let mut s = self
            .shared
            .lock()
            .map_err(|_| HwError::Serial("link poisoned".to_owned()))?;
        let inbox = match self.end {
            End::A => &mut s.a_inbox,
            End::B => &mut s.b_inbox,
        };
        match inbox.pop_front() {
            Some(line) => Ok(Some(line)),
            None if s.closed => Err(Box::new(HwError::Disconnected)),
            None => Ok(None),
        }
    }

    fn send_line(&mut self, line: &str) -> Result<(), BoxError> {
        let mut s = self
            .shared
            .lock()
            .map_err(|_| HwError::Serial("link poisoned".to_owned()))?;
        if s.closed {
            return Err(Box::new(HwError::Disconnected));
        }
        let peer = match self.end {
            End::A => &mut s.b_inbox,
            End::B => &mut s.a_inbox,
        };
        peer.push_back(line.to_owned());
        Ok(())
    }
}

/// Stdin/stdout command console. A reader thread feeds complete lines into
/// a bounded channel so `poll_line` never blocks; EOF reports the peer as
/// gone.
pub struct StdioLink {
    rx: crossbeam_channel::Receiver<String>,
}

impl StdioLink {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(64);
        std::thread::spawn(move || {
            use std::io::BufRead;
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
            // tx dropped here; the consumer sees Disconnected after EOF
        });
        Self { rx }
    }
}

impl Default for StdioLink {
    fn default() -> Self {
        Self::new()
    }
}

impl LineLink for StdioLink {
    fn poll_line(&mut self) -> Result<Option<String>, BoxError> {
        match self.rx.try_recv() {
            Ok(line) => Ok(Some(line)),
            Err(crossbeam_channel::TryRecvError::Empty) => Ok(None),
            Err(crossbeam_channel::TryRecvError::Disconnected) => {
                Err(Box::new(HwError::Disconnected))
            }
        }
    }

    fn send_line(&mut self, line: &str) -> Result<(), BoxError> {
        let mut out = std::io::stdout().lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wheel_traits::HBridge;

    #[test]
    fn simulated_bridge_records_state() {
        let mut b = SimulatedHBridge::new();
        let duty = b.duty_handle();
        let pins = b.pins_handle();
        b.set_duty(4096).unwrap();
        b.set_direction(true, false).unwrap();
        assert_eq!(duty.get(), 4096);
        assert_eq!(pins.get(), (true, false));
    }

    #[test]
    fn memory_link_round_trips_lines() {
        let (mut a, mut b) = MemoryLink::pair();
        a.send_line("status").unwrap();
        assert_eq!(b.poll_line().unwrap().as_deref(), Some("status"));
        assert_eq!(b.poll_line().unwrap(), None);
        b.send_line("OK").unwrap();
        assert_eq!(a.poll_line().unwrap().as_deref(), Some("OK"));
    }

    #[test]
    fn closed_memory_link_reports_disconnect_after_drain() {
        let (mut a, b) = MemoryLink::pair();
        b.close();
        assert!(a.poll_line().is_err());
        let (mut a, mut b) = MemoryLink::pair();
        b.send_line("last words").unwrap();
        b.close();
        assert_eq!(a.poll_line().unwrap().as_deref(), Some("last words"));
        assert!(a.poll_line().is_err());
    }
}
