//! Serial-port line link for the bridge↔controller connection.
//!
//! `serialport` reads block up to their timeout, so a dedicated reader
//! thread owns the receive side and feeds complete lines into a bounded
//! channel; `poll_line` is then a non-blocking `try_recv`. The thread exits
//! on shutdown, on a hard read error, or when the consumer is dropped.

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use wheel_traits::LineLink;

use crate::error::{HwError, Result};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const READ_CHUNK: usize = 256;
const READ_TIMEOUT: Duration = Duration::from_millis(50);
const LINE_BACKLOG: usize = 64;

pub struct SerialLink {
    writer: Box<dyn serialport::SerialPort>,
    rx: xch::Receiver<String>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl SerialLink {
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let writer = serialport::new(path, baud)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| HwError::Serial(format!("{path}: {e}")))?;
        let mut reader = writer
            .try_clone()
            .map_err(|e| HwError::Serial(e.to_string()))?;

        let (tx, rx) = xch::bounded(LINE_BACKLOG);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_reader = Arc::clone(&shutdown);

        let join_handle = std::thread::spawn(move || {
            let mut pending: Vec<u8> = Vec::new();
            let mut chunk = [0u8; READ_CHUNK];
            loop {
                if shutdown_reader.load(Ordering::Relaxed) {
                    break;
                }
                match reader.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        for &byte in &chunk[..n] {
                            if byte == b'\n' {
                                let line = String::from_utf8_lossy(&pending)
                                    .trim_end_matches('\r')
                                    .to_owned();
                                pending.clear();
                                if tx.send(line).is_err() {
                                    return;
                                }
                            } else {
                                pending.push(byte);
                            }
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "serial read failed, link down");
                        break;
                    }
                }
            }
            // tx dropped: consumer sees Disconnected once drained
        });

        tracing::info!(path, baud, "serial link open");
        Ok(Self {
            writer,
            rx,
            shutdown,
            join_handle: Some(join_handle),
        })
    }
}

impl LineLink for SerialLink {
    fn poll_line(&mut self) -> std::result::Result<Option<String>, BoxError> {
        match self.rx.try_recv() {
            Ok(line) => Ok(Some(line)),
            Err(xch::TryRecvError::Empty) => Ok(None),
            Err(xch::TryRecvError::Disconnected) => Err(Box::new(HwError::Disconnected)),
        }
    }

    fn send_line(&mut self, line: &str) -> std::result::Result<(), BoxError> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("serial reader thread panicked");
        }
    }
}
