//! # diam-sm - Diameter Peer State Machine
//!
//! Gates every inbound Diameter message on a connection behind the
//! Capabilities-Exchange handshake, negotiates which applications the local
//! node advertises, answers Device-Watchdog requests, and lets a host
//! application register handlers for post-handshake traffic without being
//! able to take over the handshake itself.
//!
//! ## Features
//!
//! - **Application negotiation**: advertised applications are derived from an
//!   explicit [`Dictionary`] and operator filters (`"1"`, `"TGPP.TGPP S6A"`)
//! - **Handshake gate**: non-CER traffic from unverified peers is dropped
//!   silently; the peer retries or the transport disconnects it
//! - **Reserved commands**: CER, CEA and DWR cannot be overridden
//! - **Event queues**: bounded, non-blocking error reports and
//!   handshake notifications with a configurable overflow policy
//!
//! ### Architecture
//!
//! ```text
//!  transport ──(conn, msg)──> StateMachine::dispatch
//!                                  │
//!                                  ▼
//!                               Router ── CER ──> CapabilitiesExchange ──> CEA
//!                                  │                      │
//!                                  │                      ├─> PeerState::verify (once)
//!                                  │                      └─> handshake_notify()
//!                                  │
//!                                  └── DWR, RAR, ... ──> HandshakeGate ──> handler
//!                                                            │
//!                                                            └─ unverified: drop
//!
//!  failures ──────────────────────────────────────────────> error_reports()
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use diam_sm::{ConnRef, Dictionary, Message, Settings, StateMachine};
//!
//! let dict = Dictionary::from_file("dictionary.toml")?;
//! let settings = Settings::from_file("diam.toml")?;
//! let sm = StateMachine::new(settings, &dict);
//!
//! sm.handle_fn("CCR", |conn: &ConnRef, msg: &Message| {
//!     let answer = msg.answer(diam_sm::protocol::result_code::SUCCESS);
//!     let _ = conn.write_message(&answer);
//! });
//!
//! // Drain events somewhere
//! let errors = sm.error_reports();
//! tokio::spawn(async move {
//!     while let Some(report) = errors.recv().await {
//!         tracing::warn!("{report}");
//!     }
//! });
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: state machine, handshake handlers, command table
//! - [`dict`]: application dictionary
//! - [`events`]: error reports and handshake notifications
//! - [`config`]: settings
//! - [`transport`]: in-memory connection
//! - [`error`]: error types and result aliases

pub mod config;
pub mod dict;
pub mod error;
pub mod events;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use config::{EventConfig, OverflowPolicy, Settings};
pub use dict::{App, AppType, Command, Dictionary, Vendor};
pub use error::{Result, SmError};
pub use events::{ErrorReport, EventReceiver};
pub use protocol::{
    prepare_supported_apps, CommandIndex, Conn, ConnRef, Handler, Message, PeerMetadata,
    PeerState, StateMachine, SupportedApp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
