//! Peer state machine error types.
//!
//! Nothing in this crate treats an error as fatal. Errors either become a
//! failure answer written back to the peer (see [`SmError::result_code`]) or
//! an [`ErrorReport`](crate::events::ErrorReport) pushed on the error queue.

use thiserror::Error;

use crate::protocol::{result_code, CommandIndex};

/// State machine errors.
#[derive(Error, Debug)]
pub enum SmError {
    /// A host handler tried to take over a handshake or watchdog command.
    #[error("cannot overwrite {0} command in the state machine")]
    ReservedCommand(String),

    /// A handler was registered under a name no known command has.
    #[error("unknown command {0}: not a base command and not in the dictionary")]
    UnknownCommand(String),

    /// A mandatory AVP is missing from an inbound request.
    #[error("missing AVP: {name}")]
    MissingAvp {
        /// AVP name, e.g. `Origin-Host`.
        name: &'static str,
        /// AVP code.
        code: u32,
    },

    /// The peer advertised no application this node supports.
    #[error("no common application: peer advertised {0:?}")]
    NoCommonApplication(Vec<u32>),

    /// No handler is registered for an inbound command.
    #[error("unhandled command {0}")]
    UnhandledCommand(CommandIndex),

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Writing an answer to the connection failed.
    #[error("write error: {0}")]
    Write(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SmError {
    /// Result-Code to put in a failure answer caused by this error.
    pub fn result_code(&self) -> u32 {
        match self {
            Self::MissingAvp { .. } => result_code::MISSING_AVP,
            Self::NoCommonApplication(_) => result_code::NO_COMMON_APPLICATION,
            Self::InvalidMessage(_) => result_code::INVALID_AVP_VALUE,
            _ => result_code::UNABLE_TO_COMPLY,
        }
    }
}

/// Result type alias for state machine operations
pub type Result<T> = std::result::Result<T, SmError>;

impl From<toml::de::Error> for SmError {
    fn from(err: toml::de::Error) -> Self {
        SmError::Config(err.to_string())
    }
}
