//! Peer state machine.

use std::sync::Arc;

use super::handshake::{capabilities_request, CapabilitiesExchange, DeviceWatchdog};
use super::{
    handshake_ok, prepare_supported_apps, CommandIndex, ConnRef, Handler, HandlerRef, Message,
    Router, SupportedApp, CAPABILITIES_EXCHANGE, DEVICE_WATCHDOG,
};
use crate::config::Settings;
use crate::dict::Dictionary;
use crate::error::SmError;
use crate::events::{self, ErrorReport, EventReceiver, EventSender};

/// Base CER index
pub const BASE_CER_IDX: CommandIndex = CommandIndex::new(0, CAPABILITIES_EXCHANGE, true);
/// Base CEA index
pub const BASE_CEA_IDX: CommandIndex = CommandIndex::new(0, CAPABILITIES_EXCHANGE, false);
/// Base DWR index
pub const BASE_DWR_IDX: CommandIndex = CommandIndex::new(0, DEVICE_WATCHDOG, true);

const RESERVED_NAMES: [&str; 3] = ["CER", "CEA", "DWR"];
const RESERVED_INDICES: [CommandIndex; 3] = [BASE_CER_IDX, BASE_CEA_IDX, BASE_DWR_IDX];

/// State shared by the built-in handlers
pub(crate) struct Core {
    pub(crate) settings: Settings,
    pub(crate) supported_apps: Vec<SupportedApp>,
    errors: EventSender<ErrorReport>,
    handshakes: EventSender<ConnRef>,
    error_rx: EventReceiver<ErrorReport>,
    handshake_rx: EventReceiver<ConnRef>,
}

impl Core {
    pub(crate) fn report(&self, report: ErrorReport) {
        tracing::warn!("{}", report);
        self.errors.push(report);
    }

    pub(crate) fn notify_handshake(&self, conn: &ConnRef) {
        self.handshakes.push(ConnRef::clone(conn));
    }

    /// Write an answer; failures are reported, not returned
    pub(crate) fn write(&self, conn: &ConnRef, request: &Message, answer: &Message) -> bool {
        match conn.write_message(answer) {
            Ok(()) => true,
            Err(err) => {
                self.report(ErrorReport::new(err).with_message(request).with_conn(conn));
                false
            },
        }
    }
}

/// Command dispatcher that owns the CER/CEA handshake and DWR/DWA
/// exchange, for clients or servers.
///
/// Handlers registered here only run after the peer has passed the
/// handshake. CER, CEA and DWR cannot be registered; attempts are reported
/// on [`error_reports`](Self::error_reports) and otherwise ignored.
pub struct StateMachine {
    core: Arc<Core>,
    router: Router,
}

impl StateMachine {
    /// Create a state machine advertising the applications selected from
    /// `dict` by `settings.supported_apps`.
    pub fn new(settings: Settings, dict: &Dictionary) -> Self {
        let settings = settings.normalized();
        let supported_apps = prepare_supported_apps(dict, settings.supported_apps.as_deref());
        tracing::debug!(
            "{} locally supported application(s): {:?}",
            supported_apps.len(),
            supported_apps.iter().map(|a| a.id).collect::<Vec<_>>()
        );

        let invalid = settings.validate().err();
        let (errors, error_rx) = events::queue("error-reports", &settings.events);
        let (handshakes, handshake_rx) = events::queue("handshake-notify", &settings.events);
        let core = Arc::new(Core {
            settings,
            supported_apps,
            errors,
            handshakes,
            error_rx,
            handshake_rx,
        });

        if let Some(err) = invalid {
            core.report(ErrorReport::new(err));
        }

        let router = Router::with_dictionary(dict);
        let cer: HandlerRef = Arc::new(CapabilitiesExchange::new(Arc::clone(&core)));
        let dwr = handshake_ok(Arc::new(DeviceWatchdog::new(Arc::clone(&core))));
        router.handle("CER", Arc::clone(&cer));
        router.handle("DWR", Arc::clone(&dwr));
        router.handle_idx(BASE_CER_IDX, cer);
        router.handle_idx(BASE_DWR_IDX, dwr);

        Self { core, router }
    }

    /// Settings in effect (legacy address already promoted)
    pub fn settings(&self) -> &Settings {
        &self.core.settings
    }

    /// Applications advertised in CEA
    pub fn supported_apps(&self) -> &[SupportedApp] {
        &self.core.supported_apps
    }

    /// Register a handler by command short name, e.g. `"RAR"`
    pub fn handle<H: Handler + 'static>(&self, cmd: &str, handler: H) {
        self.handle_ref(cmd, Arc::new(handler));
    }

    /// Register a closure by command short name
    pub fn handle_fn<F>(&self, cmd: &str, handler: F)
    where
        F: Fn(&ConnRef, &Message) + Send + Sync + 'static,
    {
        self.handle(cmd, handler);
    }

    /// Register a shared handler by command short name. The name must be a
    /// base command or a command of the dictionary.
    pub fn handle_ref(&self, cmd: &str, handler: HandlerRef) {
        if RESERVED_NAMES.contains(&cmd) {
            self.error(ErrorReport::new(SmError::ReservedCommand(cmd.to_string())));
            return;
        }
        if !self.router.knows(cmd) {
            self.error(ErrorReport::new(SmError::UnknownCommand(cmd.to_string())));
            return;
        }
        self.router.handle(cmd, handshake_ok(handler));
    }

    /// Register a handler by command index
    pub fn handle_idx<H: Handler + 'static>(&self, idx: CommandIndex, handler: H) {
        self.handle_idx_ref(idx, Arc::new(handler));
    }

    /// Register a shared handler by command index
    pub fn handle_idx_ref(&self, idx: CommandIndex, handler: HandlerRef) {
        if RESERVED_INDICES.contains(&idx) {
            self.error(ErrorReport::new(SmError::ReservedCommand(idx.to_string())));
            return;
        }
        self.router.handle_idx(idx, handshake_ok(handler));
    }

    /// Dispatch an inbound message
    pub fn dispatch(&self, conn: &ConnRef, msg: &Message) {
        match self.router.handler_for(msg) {
            Some(handler) => handler.serve(conn, msg),
            None => self.error(
                ErrorReport::new(SmError::UnhandledCommand(msg.command_index()))
                    .with_message(msg)
                    .with_conn(conn),
            ),
        }
    }

    /// Push a report on the error queue
    pub fn error(&self, report: ErrorReport) {
        self.core.report(report);
    }

    /// Error reports: invalid settings, rejected registrations, failed
    /// handshakes, write failures, unhandled commands
    pub fn error_reports(&self) -> EventReceiver<ErrorReport> {
        self.core.error_rx.clone()
    }

    /// Connections that completed the handshake, once per connection
    pub fn handshake_notify(&self) -> EventReceiver<ConnRef> {
        self.core.handshake_rx.clone()
    }

    /// Build a CER from the local settings, for nodes that initiate the
    /// handshake
    pub fn capabilities_request(&self, hop_by_hop_id: u32, end_to_end_id: u32) -> Message {
        capabilities_request(
            &self.core.settings,
            &self.core.supported_apps,
            hop_by_hop_id,
            end_to_end_id,
        )
    }
}

impl Handler for StateMachine {
    fn serve(&self, conn: &ConnRef, msg: &Message) {
        self.dispatch(conn, msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::{App, AppType};
    use crate::protocol::{result_code, Conn};
    use crate::transport::MemoryConn;

    fn state_machine() -> StateMachine {
        let dict = Dictionary::new(vec![
            App::new(0, "Base", AppType::Auth),
            App::new(4, "Charging Control", AppType::Auth),
        ]);
        StateMachine::new(Settings::new("srv", "realm"), &dict)
    }

    #[test]
    fn test_builtin_routes() {
        let sm = state_machine();
        assert_eq!(sm.router.len(), 4);
        assert_eq!(sm.supported_apps().len(), 1);
    }

    #[test]
    fn test_reserved_names_rejected() {
        let sm = state_machine();
        for name in RESERVED_NAMES {
            sm.handle_fn(name, |_, _| {});
        }
        assert_eq!(sm.router.len(), 4);

        let errors = sm.error_reports();
        for name in RESERVED_NAMES {
            let report = errors.try_recv().unwrap();
            assert!(matches!(&report.error, SmError::ReservedCommand(cmd) if cmd == name));
        }
        assert!(errors.try_recv().is_none());
    }

    #[test]
    fn test_reserved_indices_rejected() {
        let sm = state_machine();
        for idx in RESERVED_INDICES {
            sm.handle_idx(idx, |_: &ConnRef, _: &Message| {});
        }
        assert_eq!(sm.router.len(), 4);
        assert_eq!(sm.error_reports().len(), 3);

        sm.handle_idx(CommandIndex::new(4, 272, true), |_: &ConnRef, _: &Message| {});
        assert_eq!(sm.router.len(), 5);
        assert_eq!(sm.error_reports().len(), 3);
    }

    #[test]
    fn test_unknown_name_rejected() {
        let sm = state_machine();
        sm.handle_fn("ULR", |_, _| {});
        assert_eq!(sm.router.len(), 4);

        let report = sm.error_reports().try_recv().unwrap();
        assert!(matches!(&report.error, SmError::UnknownCommand(cmd) if cmd == "ULR"));
    }

    #[test]
    fn test_dictionary_command_accepted() {
        let dict = Dictionary::new(vec![App::new(16777251, "S6A", AppType::Auth)
            .with_vendor(10415, "TGPP")
            .with_command(316, "UL", "Update-Location")]);
        let sm = StateMachine::new(Settings::new("srv", "realm"), &dict);
        sm.handle_fn("ULR", |_, _| {});

        assert_eq!(sm.router.len(), 5);
        assert!(sm.error_reports().is_empty());
    }

    #[test]
    fn test_invalid_settings_reported() {
        let sm = StateMachine::new(Settings::new("", "realm"), &Dictionary::default());
        let report = sm.error_reports().try_recv().unwrap();
        assert!(matches!(report.error, SmError::Config(_)));
        assert!(state_machine().error_reports().is_empty());
    }

    #[test]
    fn test_dwa_after_handshake() {
        let sm = state_machine();
        let mem = MemoryConn::new();
        let conn: ConnRef = mem.clone();

        let dwr = Message::request(DEVICE_WATCHDOG, 0, 3, 3);
        sm.dispatch(&conn, &dwr);
        assert!(mem.written().is_empty());

        let client = StateMachine::new(
            Settings::new("cli", "realm"),
            &Dictionary::new(vec![App::new(4, "Charging Control", AppType::Auth)]),
        );
        sm.dispatch(&conn, &client.capabilities_request(1, 1));
        assert!(mem.peer().is_verified());

        sm.dispatch(&conn, &dwr);
        let dwa = mem.last_written().unwrap();
        assert_eq!(dwa.command_index(), CommandIndex::new(0, DEVICE_WATCHDOG, false));
        assert_eq!(dwa.result_code(), Some(result_code::SUCCESS));
        assert_eq!(sm.handshake_notify().len(), 1);
    }
}
