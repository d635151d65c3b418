//! In-memory connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, SmError};
use crate::protocol::{Conn, Message, PeerState};

/// Connection that keeps written messages in memory.
#[derive(Debug, Default)]
pub struct MemoryConn {
    peer: PeerState,
    written: Mutex<Vec<Message>>,
    local_addr: Option<SocketAddr>,
    remote_addr: Option<SocketAddr>,
    closed: AtomicBool,
}

impl MemoryConn {
    /// New connection without addresses
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// New connection with local and remote addresses
    pub fn with_addrs(local: SocketAddr, remote: SocketAddr) -> Arc<Self> {
        Arc::new(Self {
            local_addr: Some(local),
            remote_addr: Some(remote),
            ..Default::default()
        })
    }

    /// Messages written so far
    pub fn written(&self) -> Vec<Message> {
        self.written.lock().clone()
    }

    /// Remove and return messages written so far
    pub fn take_written(&self) -> Vec<Message> {
        std::mem::take(&mut *self.written.lock())
    }

    /// Most recently written message
    pub fn last_written(&self) -> Option<Message> {
        self.written.lock().last().cloned()
    }

    /// Make subsequent writes fail
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl Conn for MemoryConn {
    fn peer(&self) -> &PeerState {
        &self.peer
    }

    fn write_message(&self, msg: &Message) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SmError::Write("connection closed".to_string()));
        }
        self.written.lock().push(msg.clone());
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}
