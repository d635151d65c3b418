//! Message handlers and the handshake gate.

use std::sync::Arc;

use super::{ConnRef, Message};

/// Handles one inbound message on a connection.
///
/// Closures `Fn(&ConnRef, &Message)` implement this trait.
pub trait Handler: Send + Sync {
    /// Handle the message; answers are written through `conn`
    fn serve(&self, conn: &ConnRef, msg: &Message);
}

impl<F> Handler for F
where
    F: Fn(&ConnRef, &Message) + Send + Sync,
{
    fn serve(&self, conn: &ConnRef, msg: &Message) {
        self(conn, msg);
    }
}

/// Shared handler
pub type HandlerRef = Arc<dyn Handler>;

/// Runs the wrapped handler only for peers that passed the handshake.
///
/// Messages from unverified peers are dropped: no answer, no error report.
pub struct HandshakeGate {
    inner: HandlerRef,
}

impl HandshakeGate {
    /// Wrap a handler
    pub fn new(inner: HandlerRef) -> Self {
        Self { inner }
    }
}

impl Handler for HandshakeGate {
    fn serve(&self, conn: &ConnRef, msg: &Message) {
        if conn.peer().is_verified() {
            self.inner.serve(conn, msg);
        } else {
            tracing::trace!(
                "Dropping {} from unverified peer {:?}",
                msg.command_index(),
                conn.remote_addr()
            );
        }
    }
}

/// Wrap `handler` in a [`HandshakeGate`]
pub fn handshake_ok(handler: HandlerRef) -> HandlerRef {
    Arc::new(HandshakeGate::new(handler))
}
