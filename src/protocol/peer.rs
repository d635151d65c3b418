//! Per-connection peer state.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use super::Message;
use crate::error::Result;

/// What the peer told us in its successful CER
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerMetadata {
    /// Peer Origin-Host
    pub origin_host: String,
    /// Peer Origin-Realm
    pub origin_realm: String,
    /// Application ids the peer advertised
    pub applications: Vec<u32>,
}

/// Handshake state of one connection.
///
/// Unverified until the first successful CER, verified for the rest of the
/// connection's life.
#[derive(Debug, Default)]
pub struct PeerState {
    metadata: OnceLock<PeerMetadata>,
}

impl PeerState {
    /// New, unverified peer
    pub fn new() -> Self {
        Self::default()
    }

    /// Has the peer passed the CER/CEA handshake
    pub fn is_verified(&self) -> bool {
        self.metadata.get().is_some()
    }

    /// Peer identity, once verified
    pub fn metadata(&self) -> Option<&PeerMetadata> {
        self.metadata.get()
    }

    /// Mark the peer verified. Returns true only for the call that made the
    /// transition; concurrent and later calls return false and keep the
    /// first metadata.
    pub(crate) fn verify(&self, metadata: PeerMetadata) -> bool {
        self.metadata.set(metadata).is_ok()
    }
}

/// A peer connection as seen by the state machine.
///
/// Implemented by the transport. The connection owns its [`PeerState`].
pub trait Conn: Send + Sync {
    /// Handshake state of this connection
    fn peer(&self) -> &PeerState;

    /// Send a message to the peer
    fn write_message(&self, msg: &Message) -> Result<()>;

    /// Local address, used as Host-IP-Address when none is configured
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }

    /// Remote address, for logging
    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// Shared connection handle
pub type ConnRef = Arc<dyn Conn>;

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(host: &str) -> PeerMetadata {
        PeerMetadata {
            origin_host: host.to_string(),
            origin_realm: "example.com".to_string(),
            applications: vec![4],
        }
    }

    #[test]
    fn test_verify_once() {
        let peer = PeerState::new();
        assert!(!peer.is_verified());
        assert!(peer.metadata().is_none());

        assert!(peer.verify(metadata("first")));
        assert!(peer.is_verified());

        assert!(!peer.verify(metadata("second")));
        assert_eq!(peer.metadata().unwrap().origin_host, "first");
    }

    #[test]
    fn test_concurrent_verify_single_winner() {
        let peer = PeerState::new();
        let winners: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let peer = &peer;
                    s.spawn(move || usize::from(peer.verify(metadata(&format!("host{i}")))))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(winners, 1);
    }
}
