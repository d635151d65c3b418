//! Diameter peer state machine: handshake gate and application negotiation.
//!
//! Every inbound message on a connection is dispatched through the
//! [`StateMachine`]. Only the Capabilities-Exchange-Request may run before the
//! peer has completed the handshake; everything else, Device-Watchdog included,
//! is gated on the connection's [`PeerState`].
//!
//! # Message Flow
//!
//! ```text
//! Peer                              Node
//!    |                                |
//!    |-------- CER (identity) ------->|  Validate Origin-Host / Origin-Realm,
//!    |                                |  intersect applications
//!    |<------- CEA (2001, apps) ------|  Peer marked verified, notify once
//!    |      or CEA (5005 / 5010)      |  or failure answer + error report
//!    |                                |
//!    |======= RAR / CCR / ... =======>|  Host handlers (gated)
//!    |                                |
//!    |-------- DWR ------------------>|  Watchdog (gated)
//!    |<------- DWA (2001) ------------|
//! ```
//!
//! ## State Machine
//!
//! | State        | Description                          | Valid Transitions |
//! |--------------|--------------------------------------|-------------------|
//! | `Unverified` | Connected, no successful CER yet     | → Verified        |
//! | `Verified`   | CER answered with success            | (terminal)        |
//!
//! Messages other than CER from an unverified peer are dropped without an
//! answer and without an error report.
//!
//! ## Reserved Commands
//!
//! | Command | Index (app, code, R) | Wiring                 |
//! |---------|----------------------|------------------------|
//! | `CER`   | (0, 257, true)       | built-in, never gated  |
//! | `CEA`   | (0, 257, false)      | not registrable        |
//! | `DWR`   | (0, 280, true)       | built-in, gated        |
//!
//! # Usage
//!
//! ```rust,ignore
//! use diam_sm::{Dictionary, Settings, StateMachine};
//!
//! let dict = Dictionary::from_file("dictionary.toml")?;
//! let sm = StateMachine::new(Settings::new("node.example.com", "example.com"), &dict);
//!
//! sm.handle_fn("RAR", |conn, msg| {
//!     // only reached after a successful CER/CEA
//! });
//!
//! // transport loop
//! sm.dispatch(&conn, &msg);
//! ```

mod apps;
mod handler;
mod handshake;
mod message;
mod peer;
mod router;
mod state_machine;

pub use apps::{compute_app_filters, prepare_supported_apps, ApplicationFilter, SupportedApp};
pub use handler::{handshake_ok, Handler, HandlerRef, HandshakeGate};
pub use message::{
    Avp, AvpData, CommandIndex, Header, Message, FLAG_ERROR, FLAG_PROXIABLE, FLAG_REQUEST,
    FLAG_RETRANSMITTED,
};
pub use peer::{Conn, ConnRef, PeerMetadata, PeerState};
pub use router::{command_name, Router};
pub use state_machine::{StateMachine, BASE_CEA_IDX, BASE_CER_IDX, BASE_DWR_IDX};

/// Capabilities-Exchange command code (CER/CEA).
pub const CAPABILITIES_EXCHANGE: u32 = 257;
/// Re-Auth command code (RAR/RAA).
pub const RE_AUTH: u32 = 258;
/// Accounting command code (ACR/ACA).
pub const ACCOUNTING: u32 = 271;
/// Credit-Control command code (CCR/CCA).
pub const CREDIT_CONTROL: u32 = 272;
/// Abort-Session command code (ASR/ASA).
pub const ABORT_SESSION: u32 = 274;
/// Session-Termination command code (STR/STA).
pub const SESSION_TERMINATION: u32 = 275;
/// Device-Watchdog command code (DWR/DWA).
pub const DEVICE_WATCHDOG: u32 = 280;
/// Disconnect-Peer command code (DPR/DPA).
pub const DISCONNECT_PEER: u32 = 282;

/// Relay application id; matches any application during negotiation.
pub const RELAY_APPLICATION_ID: u32 = 0xffff_ffff;

/// AVP codes and flags used by the handshake.
pub mod avp {
    /// Vendor-specific bit.
    pub const VBIT: u8 = 0x80;
    /// Mandatory bit.
    pub const MBIT: u8 = 0x40;

    /// Host-IP-Address
    pub const HOST_IP_ADDRESS: u32 = 257;
    /// Auth-Application-Id
    pub const AUTH_APPLICATION_ID: u32 = 258;
    /// Acct-Application-Id
    pub const ACCT_APPLICATION_ID: u32 = 259;
    /// Vendor-Specific-Application-Id
    pub const VENDOR_SPECIFIC_APPLICATION_ID: u32 = 260;
    /// Session-Id
    pub const SESSION_ID: u32 = 263;
    /// Origin-Host
    pub const ORIGIN_HOST: u32 = 264;
    /// Supported-Vendor-Id
    pub const SUPPORTED_VENDOR_ID: u32 = 265;
    /// Vendor-Id
    pub const VENDOR_ID: u32 = 266;
    /// Firmware-Revision
    pub const FIRMWARE_REVISION: u32 = 267;
    /// Result-Code
    pub const RESULT_CODE: u32 = 268;
    /// Product-Name
    pub const PRODUCT_NAME: u32 = 269;
    /// Origin-State-Id
    pub const ORIGIN_STATE_ID: u32 = 278;
    /// Failed-AVP
    pub const FAILED_AVP: u32 = 279;
    /// Error-Message
    pub const ERROR_MESSAGE: u32 = 281;
    /// Origin-Realm
    pub const ORIGIN_REALM: u32 = 296;
}

/// Result-Code values produced by the handshake handlers.
pub mod result_code {
    /// DIAMETER_SUCCESS
    pub const SUCCESS: u32 = 2001;
    /// DIAMETER_INVALID_AVP_VALUE
    pub const INVALID_AVP_VALUE: u32 = 5004;
    /// DIAMETER_MISSING_AVP
    pub const MISSING_AVP: u32 = 5005;
    /// DIAMETER_NO_COMMON_APPLICATION
    pub const NO_COMMON_APPLICATION: u32 = 5010;
    /// DIAMETER_UNABLE_TO_COMPLY
    pub const UNABLE_TO_COMPLY: u32 = 5012;

    /// Protocol errors (3xxx) are answered with the E bit set.
    pub fn is_protocol_error(code: u32) -> bool {
        (3000..4000).contains(&code)
    }
}
