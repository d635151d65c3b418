//! Connection implementations.
//!
//! Socket transports (TCP, SCTP, TLS) live outside this crate and implement
//! [`Conn`](crate::protocol::Conn) themselves. [`MemoryConn`] records what
//! the state machine writes, which is what tests and embedders driving the
//! state machine from their own I/O loop need.
//!
//! # Usage
//!
//! ```rust,ignore
//! use diam_sm::transport::MemoryConn;
//! use diam_sm::ConnRef;
//!
//! let mem = MemoryConn::new();
//! let conn: ConnRef = mem.clone();
//! sm.dispatch(&conn, &cer);
//! let cea = mem.last_written().unwrap();
//! ```

mod memory;

pub use memory::MemoryConn;
