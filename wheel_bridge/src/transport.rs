//! Non-blocking TCP transport for the GUI side.
//!
//! At most one client at a time; a new connection replaces the old one.
//! All reads and writes are non-blocking and any socket error demotes the
//! client to disconnected; the motor keeps running, reconnection is just
//! the next accept.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};

use crate::error::BridgeError;

pub struct GuiTransport {
    listener: TcpListener,
    client: Option<Client>,
}

struct Client {
    stream: TcpStream,
    pending: Vec<u8>,
}

impl GuiTransport {
    pub fn bind(port: u16) -> Result<Self, BridgeError> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .map_err(|e| BridgeError::Bind(format!("port {port}: {e}")))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| BridgeError::Bind(e.to_string()))?;
        tracing::info!(port, "gui listener up");
        Ok(Self {
            listener,
            client: None,
        })
    }

    pub fn local_port(&self) -> Option<u16> {
        self.listener.local_addr().ok().map(|a| a.port())
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Accept a pending connection if any. Returns true when a new client
    /// connected this call (replacing any previous one).
    pub fn poll_accept(&mut self) -> bool {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                if stream.set_nonblocking(true).is_err() {
                    return false;
                }
                if self.client.is_some() {
                    tracing::info!(%peer, "gui client replaced");
                } else {
                    tracing::info!(%peer, "gui client connected");
                }
                self.client = Some(Client {
                    stream,
                    pending: Vec::new(),
                });
                true
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                false
            }
        }
    }

    /// Drain whatever bytes are buffered on the client socket and return
    /// the complete lines. EOF or a hard error drops the client.
    pub fn read_lines(&mut self) -> Vec<String> {
        let Some(client) = self.client.as_mut() else {
            return Vec::new();
        };
        let mut chunk = [0u8; 1024];
        let mut dropped = false;
        loop {
            match client.stream.read(&mut chunk) {
                Ok(0) => {
                    dropped = true;
                    break;
                }
                Ok(n) => client.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::warn!(error = %e, "gui read failed");
                    dropped = true;
                    break;
                }
            }
        }

        let mut lines = Vec::new();
        while let Some(pos) = client.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = client.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1])
                .trim_end_matches('\r')
                .trim()
                .to_owned();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        if dropped {
            tracing::info!("gui client disconnected");
            self.client = None;
        }
        lines
    }

    /// Best-effort line write; a failed write drops the client.
    pub fn send_line(&mut self, line: &str) {
        let Some(client) = self.client.as_mut() else {
            return;
        };
        let write = client
            .stream
            .write_all(line.as_bytes())
            .and_then(|()| client.stream.write_all(b"\n"));
        if let Err(e) = write {
            if e.kind() != ErrorKind::WouldBlock {
                tracing::warn!(error = %e, "gui write failed, dropping client");
                self.client = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::net::TcpStream;
    use std::time::Duration;

    fn connect(port: u16) -> TcpStream {
        let s = TcpStream::connect(("127.0.0.1", port)).unwrap();
        s.set_nodelay(true).unwrap();
        s
    }

    fn accept_soon(t: &mut GuiTransport) {
        for _ in 0..100 {
            if t.poll_accept() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("client never accepted");
    }

    #[test]
    fn accepts_reads_and_replaces_clients() {
        let mut t = GuiTransport::bind(0).unwrap();
        let port = t.local_port().unwrap();
        assert!(!t.poll_accept());

        let mut first = connect(port);
        accept_soon(&mut t);
        first.write_all(b"{\"type\":\"status_request\"}\npartial").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        let lines = t.read_lines();
        assert_eq!(lines, vec![r#"{"type":"status_request"}"#.to_owned()]);
        // Partial line stays buffered until its newline arrives.
        assert!(t.read_lines().is_empty());
        first.write_all(b"\n").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(t.read_lines(), vec!["partial".to_owned()]);

        // A second connection replaces the first.
        let _second = connect(port);
        accept_soon(&mut t);
        assert!(t.has_client());
    }

    #[test]
    fn eof_drops_the_client() {
        let mut t = GuiTransport::bind(0).unwrap();
        let port = t.local_port().unwrap();
        let c = connect(port);
        accept_soon(&mut t);
        drop(c);
        std::thread::sleep(Duration::from_millis(50));
        let _ = t.read_lines();
        assert!(!t.has_client());
    }
}
