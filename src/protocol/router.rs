//! Command table.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{
    CommandIndex, HandlerRef, Message, ABORT_SESSION, ACCOUNTING, CAPABILITIES_EXCHANGE,
    CREDIT_CONTROL, DEVICE_WATCHDOG, DISCONNECT_PEER, RE_AUTH, SESSION_TERMINATION,
};
use crate::dict::Dictionary;

/// Base command short names: (code, request name, answer name)
const COMMAND_NAMES: &[(u32, &str, &str)] = &[
    (CAPABILITIES_EXCHANGE, "CER", "CEA"),
    (RE_AUTH, "RAR", "RAA"),
    (ACCOUNTING, "ACR", "ACA"),
    (CREDIT_CONTROL, "CCR", "CCA"),
    (ABORT_SESSION, "ASR", "ASA"),
    (SESSION_TERMINATION, "STR", "STA"),
    (DEVICE_WATCHDOG, "DWR", "DWA"),
    (DISCONNECT_PEER, "DPR", "DPA"),
];

/// Short name of a base command, e.g. `CER` for (257, request)
pub fn command_name(code: u32, request: bool) -> Option<&'static str> {
    COMMAND_NAMES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, req, ans)| if request { *req } else { *ans })
}

/// Maps commands to handlers, by [`CommandIndex`] or by short name.
///
/// Index entries take precedence. Short names resolve through the base
/// command table plus the commands of the dictionary the router was built
/// from; base names are never redefined. Handlers can be registered while
/// messages are being dispatched.
pub struct Router {
    names: HashMap<u32, (String, String)>,
    by_index: RwLock<HashMap<CommandIndex, HandlerRef>>,
    by_name: RwLock<HashMap<String, HandlerRef>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create an empty table knowing the base command names
    pub fn new() -> Self {
        let names = COMMAND_NAMES
            .iter()
            .map(|(code, req, ans)| (*code, (req.to_string(), ans.to_string())))
            .collect();
        Self {
            names,
            by_index: RwLock::default(),
            by_name: RwLock::default(),
        }
    }

    /// Create an empty table that also knows the dictionary's commands
    pub fn with_dictionary(dict: &Dictionary) -> Self {
        let mut router = Self::new();
        for cmd in dict.commands() {
            router
                .names
                .entry(cmd.code)
                .or_insert_with(|| (cmd.request_name(), cmd.answer_name()));
        }
        router
    }

    /// Short name of a command known to this table
    pub fn name_of(&self, code: u32, request: bool) -> Option<&str> {
        self.names
            .get(&code)
            .map(|(req, ans)| if request { req.as_str() } else { ans.as_str() })
    }

    /// Check if a short name resolves to a command
    pub fn knows(&self, name: &str) -> bool {
        self.names.values().any(|(req, ans)| req == name || ans == name)
    }

    /// Register by short name, replacing any previous handler
    pub fn handle(&self, name: &str, handler: HandlerRef) {
        self.by_name.write().insert(name.to_string(), handler);
    }

    /// Register by index, replacing any previous handler
    pub fn handle_idx(&self, idx: CommandIndex, handler: HandlerRef) {
        self.by_index.write().insert(idx, handler);
    }

    /// Find the handler for a message
    pub fn handler_for(&self, msg: &Message) -> Option<HandlerRef> {
        let idx = msg.command_index();
        if let Some(handler) = self.by_index.read().get(&idx) {
            return Some(HandlerRef::clone(handler));
        }
        let name = self.name_of(idx.code, idx.request)?;
        self.by_name.read().get(name).cloned()
    }

    /// Number of registered entries (index and name)
    pub fn len(&self) -> usize {
        self.by_index.read().len() + self.by_name.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::dict::{App, AppType};
    use crate::protocol::{ConnRef, Handler};
    use crate::transport::MemoryConn;

    fn recording(tag: u32, seen: &Arc<AtomicU32>) -> HandlerRef {
        let seen = Arc::clone(seen);
        Arc::new(move |_: &ConnRef, _: &Message| seen.store(tag, Ordering::SeqCst))
    }

    #[test]
    fn test_command_names() {
        assert_eq!(command_name(257, true), Some("CER"));
        assert_eq!(command_name(257, false), Some("CEA"));
        assert_eq!(command_name(280, true), Some("DWR"));
        assert_eq!(command_name(1, true), None);
    }

    #[test]
    fn test_lookup_by_name() {
        let seen = Arc::new(AtomicU32::new(0));
        let router = Router::new();
        router.handle("RAR", recording(1, &seen));

        let conn: ConnRef = MemoryConn::new();
        let msg = Message::request(RE_AUTH, 4, 1, 1);
        router.handler_for(&msg).unwrap().serve(&conn, &msg);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        assert!(router.handler_for(&msg.answer(2001)).is_none());
    }

    #[test]
    fn test_index_takes_precedence() {
        let seen = Arc::new(AtomicU32::new(0));
        let router = Router::new();
        router.handle("CCR", recording(1, &seen));
        router.handle_idx(CommandIndex::new(4, CREDIT_CONTROL, true), recording(2, &seen));

        let conn: ConnRef = MemoryConn::new();
        let msg = Message::request(CREDIT_CONTROL, 4, 1, 1);
        router.handler_for(&msg).unwrap().serve(&conn, &msg);
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        // other application falls back to the name entry
        let msg = Message::request(CREDIT_CONTROL, 16777238, 1, 1);
        router.handler_for(&msg).unwrap().serve(&conn, &msg);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_dictionary_commands() {
        let dict = Dictionary::new(vec![App::new(16777251, "S6A", AppType::Auth)
            .with_vendor(10415, "TGPP")
            .with_command(316, "UL", "Update-Location")
            .with_command(RE_AUTH, "XX", "Shadowed")]);
        let router = Router::with_dictionary(&dict);

        assert_eq!(router.name_of(316, true), Some("ULR"));
        assert_eq!(router.name_of(316, false), Some("ULA"));
        assert_eq!(router.name_of(RE_AUTH, true), Some("RAR"));
        assert!(router.knows("ULR"));
        assert!(!router.knows("XXR"));
        assert!(!Router::new().knows("ULR"));

        let seen = Arc::new(AtomicU32::new(0));
        router.handle("ULR", recording(3, &seen));
        let conn: ConnRef = MemoryConn::new();
        let msg = Message::request(316, 16777251, 1, 1);
        router.handler_for(&msg).unwrap().serve(&conn, &msg);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unknown_command() {
        let router = Router::new();
        assert!(router.is_empty());
        assert!(router.handler_for(&Message::request(9999, 0, 1, 1)).is_none());
    }
}
