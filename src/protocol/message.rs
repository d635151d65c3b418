//! Logical Diameter messages.
//!
//! Byte-level encoding is done by the transport; this module only models the
//! header fields and the AVP tree the handshake reads and writes.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::{avp, result_code};

/// Request bit in the command flags.
pub const FLAG_REQUEST: u8 = 0x80;
/// Proxiable bit in the command flags.
pub const FLAG_PROXIABLE: u8 = 0x40;
/// Error bit in the command flags.
pub const FLAG_ERROR: u8 = 0x20;
/// Potentially retransmitted bit in the command flags.
pub const FLAG_RETRANSMITTED: u8 = 0x10;

/// Key of the command table: application, command code and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandIndex {
    /// Application id from the header
    pub app_id: u32,
    /// Command code
    pub code: u32,
    /// Request (true) or answer (false)
    pub request: bool,
}

impl CommandIndex {
    /// Create a command index
    pub const fn new(app_id: u32, code: u32, request: bool) -> Self {
        Self {
            app_id,
            code,
            request,
        }
    }
}

impl fmt::Display for CommandIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.request { "request" } else { "answer" };
        match super::command_name(self.code, self.request) {
            Some(name) => write!(f, "{name} (app {} code {} {kind})", self.app_id, self.code),
            None => write!(f, "app {} code {} {kind}", self.app_id, self.code),
        }
    }
}

/// Message header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Command flags (R, P, E, T)
    pub flags: u8,
    /// Command code
    pub command_code: u32,
    /// Application id
    pub application_id: u32,
    /// Hop-by-Hop identifier
    pub hop_by_hop_id: u32,
    /// End-to-End identifier
    pub end_to_end_id: u32,
}

/// AVP payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum AvpData {
    /// Unsigned32
    Unsigned32(u32),
    /// UTF8String
    Utf8String(String),
    /// DiamIdent
    DiameterIdentity(String),
    /// Address
    Address(IpAddr),
    /// OctetString
    OctetString(Vec<u8>),
    /// Grouped
    Grouped(Vec<Avp>),
}

/// Attribute-value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avp {
    /// AVP code
    pub code: u32,
    /// AVP flags (V, M)
    pub flags: u8,
    /// Vendor id (0 when the V bit is clear)
    pub vendor_id: u32,
    /// Payload
    pub data: AvpData,
}

impl Avp {
    /// Create an AVP. The V bit follows `vendor_id`.
    pub fn new(code: u32, flags: u8, vendor_id: u32, data: AvpData) -> Self {
        let flags = if vendor_id != 0 {
            flags | avp::VBIT
        } else {
            flags & !avp::VBIT
        };
        Self {
            code,
            flags,
            vendor_id,
            data,
        }
    }

    /// Value as Unsigned32
    pub fn as_u32(&self) -> Option<u32> {
        match self.data {
            AvpData::Unsigned32(v) => Some(v),
            _ => None,
        }
    }

    /// Value as a string (UTF8String or DiamIdent)
    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            AvpData::Utf8String(s) | AvpData::DiameterIdentity(s) => Some(s),
            _ => None,
        }
    }

    /// Children of a Grouped AVP
    pub fn grouped(&self) -> Option<&[Avp]> {
        match &self.data {
            AvpData::Grouped(children) => Some(children),
            _ => None,
        }
    }
}

/// Diameter message: header plus ordered AVPs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Header
    pub header: Header,
    /// AVPs in wire order
    #[serde(default)]
    pub avps: Vec<Avp>,
}

impl Message {
    /// Create a request
    pub fn request(
        command_code: u32,
        application_id: u32,
        hop_by_hop_id: u32,
        end_to_end_id: u32,
    ) -> Self {
        Self {
            header: Header {
                flags: FLAG_REQUEST,
                command_code,
                application_id,
                hop_by_hop_id,
                end_to_end_id,
            },
            avps: Vec::new(),
        }
    }

    /// Create the answer to this message, starting with a Result-Code AVP.
    ///
    /// Identifiers and application id are copied, the R and T bits cleared.
    /// Protocol errors (3xxx) set the E bit.
    pub fn answer(&self, result: u32) -> Self {
        let mut flags = self.header.flags & !(FLAG_REQUEST | FLAG_RETRANSMITTED);
        if result_code::is_protocol_error(result) {
            flags |= FLAG_ERROR;
        }
        let mut answer = Self {
            header: Header { flags, ..self.header },
            avps: Vec::new(),
        };
        answer.new_avp(avp::RESULT_CODE, avp::MBIT, 0, AvpData::Unsigned32(result));
        answer
    }

    /// Append an AVP
    pub fn new_avp(&mut self, code: u32, flags: u8, vendor_id: u32, data: AvpData) -> &mut Self {
        self.avps.push(Avp::new(code, flags, vendor_id, data));
        self
    }

    /// Append a prebuilt AVP
    pub fn add_avp(&mut self, avp: Avp) -> &mut Self {
        self.avps.push(avp);
        self
    }

    /// Builder-style [`Message::new_avp`]
    pub fn with_avp(mut self, code: u32, flags: u8, vendor_id: u32, data: AvpData) -> Self {
        self.new_avp(code, flags, vendor_id, data);
        self
    }

    /// Check the R bit
    pub fn is_request(&self) -> bool {
        self.header.flags & FLAG_REQUEST != 0
    }

    /// Command table key for this message
    pub fn command_index(&self) -> CommandIndex {
        CommandIndex::new(
            self.header.application_id,
            self.header.command_code,
            self.is_request(),
        )
    }

    /// First top-level AVP with the given code
    pub fn find_avp(&self, code: u32) -> Option<&Avp> {
        self.avps.iter().find(|a| a.code == code)
    }

    /// All top-level AVPs with the given code
    pub fn find_avps(&self, code: u32) -> impl Iterator<Item = &Avp> {
        self.avps.iter().filter(move |a| a.code == code)
    }

    /// Result-Code of an answer
    pub fn result_code(&self) -> Option<u32> {
        self.find_avp(avp::RESULT_CODE).and_then(Avp::as_u32)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
