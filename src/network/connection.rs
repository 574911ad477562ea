//! Non-blocking framed TCP connections.
//!
//! Each frame on the wire is a 4-byte big-endian length prefix followed by
//! one encoded packet. Connections are owned by the transport thread; worker
//! threads never touch them.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};

use log::{debug, warn};

use crate::constants::net::MAX_FRAME_BYTES;
use crate::error::{EngineError, EngineResult};

/// Opaque peer handle assigned by the [`ConnectionManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub u32);

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// Something that can carry chunk frames to a peer. The streamer talks to
/// the transport through this seam so completions are testable without
/// sockets.
pub trait FrameSink {
    /// Queue a frame for a peer; returns false when the peer is gone.
    fn send_frame(&mut self, peer: PeerId, payload: &[u8]) -> bool;
    /// Push queued bytes onto the wire.
    fn flush(&mut self);
}

/// One framed TCP connection
pub struct Connection {
    stream: TcpStream,
    addr: SocketAddr,
    peer: PeerId,
    recv_buffer: Vec<u8>,
    send_queue: VecDeque<Vec<u8>>,
    /// Progress into the front of `send_queue`
    send_offset: usize,
    closed: bool,
}

impl Connection {
    pub fn new(stream: TcpStream, addr: SocketAddr, peer: PeerId) -> std::io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            addr,
            peer,
            recv_buffer: Vec::with_capacity(8192),
            send_queue: VecDeque::new(),
            send_offset: 0,
            closed: false,
        })
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Queue one length-prefixed frame for sending
    pub fn queue_frame(&mut self, payload: &[u8]) {
        let mut frame = Vec::with_capacity(payload.len() + 4);
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(payload);
        self.send_queue.push_back(frame);
    }

    /// Write queued frames until the socket would block
    pub fn flush_send(&mut self) {
        while let Some(front) = self.send_queue.front() {
            match self.stream.write(&front[self.send_offset..]) {
                Ok(0) => {
                    self.closed = true;
                    return;
                }
                Ok(n) => {
                    self.send_offset += n;
                    if self.send_offset >= front.len() {
                        self.send_queue.pop_front();
                        self.send_offset = 0;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("{} send failed: {e}", self.peer);
                    self.closed = true;
                    return;
                }
            }
        }
    }

    /// Drain readable bytes and split out complete frames.
    ///
    /// An oversized length prefix poisons the stream (we cannot resync), so
    /// the connection is closed; a clean EOF marks it disconnected.
    pub fn receive_frames(&mut self) -> EngineResult<Vec<Vec<u8>>> {
        let mut scratch = [0u8; 4096];
        loop {
            match self.stream.read(&mut scratch) {
                Ok(0) => {
                    self.closed = true;
                    break;
                }
                Ok(n) => self.recv_buffer.extend_from_slice(&scratch[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.closed = true;
                    return Err(e.into());
                }
            }
        }

        let mut frames = Vec::new();
        while self.recv_buffer.len() >= 4 {
            let len = u32::from_be_bytes([
                self.recv_buffer[0],
                self.recv_buffer[1],
                self.recv_buffer[2],
                self.recv_buffer[3],
            ]) as usize;
            if len > MAX_FRAME_BYTES {
                self.closed = true;
                return Err(EngineError::FrameTooLarge {
                    len,
                    max: MAX_FRAME_BYTES,
                });
            }
            if self.recv_buffer.len() < 4 + len {
                break;
            }
            frames.push(self.recv_buffer[4..4 + len].to_vec());
            self.recv_buffer.drain(..4 + len);
        }
        Ok(frames)
    }

    pub fn close(&mut self) {
        self.closed = true;
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }
}

/// Owns every live connection on the transport thread
pub struct ConnectionManager {
    connections: Vec<Connection>,
    next_peer: u32,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Vec::new(),
            next_peer: 1,
        }
    }

    pub fn add(&mut self, stream: TcpStream, addr: SocketAddr) -> std::io::Result<PeerId> {
        let peer = PeerId(self.next_peer);
        self.next_peer += 1;
        let connection = Connection::new(stream, addr, peer)?;
        debug!("{peer} connected from {addr}");
        self.connections.push(connection);
        Ok(peer)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn get_mut(&mut self, peer: PeerId) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.peer == peer)
    }

    /// Service every connection: gather complete frames and drop peers that
    /// reset or misbehaved. Mid-session errors deregister only the one peer.
    pub fn service(&mut self) -> (Vec<(PeerId, Vec<u8>)>, Vec<PeerId>) {
        let mut frames = Vec::new();
        for connection in &mut self.connections {
            match connection.receive_frames() {
                Ok(received) => {
                    frames.extend(received.into_iter().map(|f| (connection.peer, f)));
                }
                Err(e) => warn!("{} dropped: {e}", connection.peer),
            }
            connection.flush_send();
        }

        let disconnected: Vec<PeerId> = self
            .connections
            .iter()
            .filter(|c| c.is_closed())
            .map(|c| c.peer)
            .collect();
        for &peer in &disconnected {
            debug!("{peer} disconnected");
        }
        self.connections.retain(|c| !c.is_closed());
        (frames, disconnected)
    }

    pub fn remove(&mut self, peer: PeerId) {
        if let Some(connection) = self.get_mut(peer) {
            connection.close();
        }
        self.connections.retain(|c| c.peer != peer);
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for ConnectionManager {
    fn send_frame(&mut self, peer: PeerId, payload: &[u8]) -> bool {
        match self.get_mut(peer) {
            Some(connection) => {
                connection.queue_frame(payload);
                true
            }
            None => false,
        }
    }

    fn flush(&mut self) {
        for connection in &mut self.connections {
            connection.flush_send();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};

    fn pair() -> (Connection, Connection) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, server_addr) = listener.accept().unwrap();
        (
            Connection::new(client, addr, PeerId(1)).unwrap(),
            Connection::new(server, server_addr, PeerId(2)).unwrap(),
        )
    }

    fn recv_until(conn: &mut Connection, n: usize) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        for _ in 0..200 {
            frames.extend(conn.receive_frames().unwrap());
            if frames.len() >= n {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        frames
    }

    #[test]
    fn frames_survive_the_wire_in_order() {
        let (mut a, mut b) = pair();
        a.queue_frame(b"hello");
        a.queue_frame(&[0u8; 9000]); // spans several reads
        a.queue_frame(b"tail");
        while !a.send_queue.is_empty() {
            a.flush_send();
        }
        let frames = recv_until(&mut b, 3);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], b"hello");
        assert_eq!(frames[1].len(), 9000);
        assert_eq!(frames[2], b"tail");
    }

    #[test]
    fn oversized_frame_closes_the_connection() {
        let (mut a, mut b) = pair();
        // Forge a length prefix beyond the limit.
        let huge = (MAX_FRAME_BYTES as u32 + 1).to_be_bytes();
        a.stream.set_nonblocking(false).unwrap();
        a.stream.write_all(&huge).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(matches!(
            b.receive_frames(),
            Err(EngineError::FrameTooLarge { .. })
        ));
        assert!(b.is_closed());
    }

    #[test]
    fn manager_sends_through_the_sink_seam() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client_stream = TcpStream::connect(addr).unwrap();
        let (server_stream, server_addr) = listener.accept().unwrap();

        let mut manager = ConnectionManager::new();
        let peer = manager.add(server_stream, server_addr).unwrap();
        let mut client = Connection::new(client_stream, addr, PeerId(99)).unwrap();

        assert!(manager.send_frame(peer, b"chunk-bytes"));
        manager.flush();
        let frames = recv_until(&mut client, 1);
        assert_eq!(frames[0], b"chunk-bytes");

        assert!(!manager.send_frame(PeerId(12345), b"nobody-home"));
    }
}
