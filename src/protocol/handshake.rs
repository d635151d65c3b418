//! CER/CEA and DWR/DWA handling.

use std::net::IpAddr;
use std::sync::Arc;

use super::state_machine::Core;
use super::{
    avp, result_code, Avp, AvpData, ConnRef, Handler, Message, PeerMetadata, SupportedApp,
    CAPABILITIES_EXCHANGE, RELAY_APPLICATION_ID,
};
use crate::config::Settings;
use crate::dict::AppType;
use crate::error::{Result, SmError};
use crate::events::ErrorReport;

/// Answers CER. Never gated: a successful CER is what verifies the peer.
pub(crate) struct CapabilitiesExchange {
    core: Arc<Core>,
}

impl CapabilitiesExchange {
    pub(crate) fn new(core: Arc<Core>) -> Self {
        Self { core }
    }
}

impl Handler for CapabilitiesExchange {
    fn serve(&self, conn: &ConnRef, msg: &Message) {
        let core = &self.core;
        tracing::debug!("CER from {:?}", conn.remote_addr());

        let peer = match validate_cer(msg, &core.supported_apps) {
            Ok(peer) => peer,
            Err(err) => {
                let cea = failure_cea(&core.settings, msg, &err);
                core.write(conn, msg, &cea);
                core.report(ErrorReport::new(err).with_message(msg).with_conn(conn));
                return;
            },
        };

        let cea = success_cea(&core.settings, &core.supported_apps, conn, msg);
        if !core.write(conn, msg, &cea) {
            return;
        }

        let origin_host = peer.origin_host.clone();
        if conn.peer().verify(peer) {
            tracing::info!(
                "Handshake completed with {} ({:?})",
                origin_host,
                conn.remote_addr()
            );
            core.notify_handshake(conn);
        } else {
            tracing::debug!("Answered repeated CER from {}", origin_host);
        }
    }
}

/// Answers DWR. Registered behind the handshake gate.
pub(crate) struct DeviceWatchdog {
    core: Arc<Core>,
}

impl DeviceWatchdog {
    pub(crate) fn new(core: Arc<Core>) -> Self {
        Self { core }
    }
}

impl Handler for DeviceWatchdog {
    fn serve(&self, conn: &ConnRef, msg: &Message) {
        let settings = &self.core.settings;
        let mut dwa = msg.answer(result_code::SUCCESS);
        add_identity(&mut dwa, settings);
        if let Some(id) = settings.origin_state_id() {
            dwa.new_avp(avp::ORIGIN_STATE_ID, avp::MBIT, 0, AvpData::Unsigned32(id));
        }
        if self.core.write(conn, msg, &dwa) {
            tracing::debug!("DWA sent to {:?}", conn.remote_addr());
        }
    }
}

/// Check a CER and extract the peer identity.
pub(crate) fn validate_cer(cer: &Message, local: &[SupportedApp]) -> Result<PeerMetadata> {
    let origin_host = required_identity(cer, avp::ORIGIN_HOST, "Origin-Host")?;
    let origin_realm = required_identity(cer, avp::ORIGIN_REALM, "Origin-Realm")?;

    let applications = advertised_applications(cer);
    let local_relay = local.iter().any(|app| app.id == RELAY_APPLICATION_ID);
    let common = applications.iter().any(|id| {
        *id == RELAY_APPLICATION_ID || local_relay || local.iter().any(|app| app.id == *id)
    });
    if !common {
        return Err(SmError::NoCommonApplication(applications));
    }

    Ok(PeerMetadata {
        origin_host,
        origin_realm,
        applications,
    })
}

fn required_identity(msg: &Message, code: u32, name: &'static str) -> Result<String> {
    msg.find_avp(code)
        .and_then(Avp::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(SmError::MissingAvp { name, code })
}

/// Application ids in Auth-/Acct-Application-Id AVPs, top level or inside
/// Vendor-Specific-Application-Id.
fn advertised_applications(msg: &Message) -> Vec<u32> {
    let is_app_id =
        |a: &&Avp| matches!(a.code, avp::AUTH_APPLICATION_ID | avp::ACCT_APPLICATION_ID);
    let mut ids: Vec<u32> = Vec::new();
    for a in &msg.avps {
        if is_app_id(&a) {
            ids.extend(a.as_u32());
        } else if a.code == avp::VENDOR_SPECIFIC_APPLICATION_ID {
            if let Some(children) = a.grouped() {
                ids.extend(children.iter().filter(is_app_id).filter_map(Avp::as_u32));
            }
        }
    }
    ids
}

fn add_identity(msg: &mut Message, settings: &Settings) {
    msg.new_avp(
        avp::ORIGIN_HOST,
        avp::MBIT,
        0,
        AvpData::DiameterIdentity(settings.origin_host.clone()),
    );
    msg.new_avp(
        avp::ORIGIN_REALM,
        avp::MBIT,
        0,
        AvpData::DiameterIdentity(settings.origin_realm.clone()),
    );
}

fn add_host_addresses(msg: &mut Message, addrs: impl IntoIterator<Item = IpAddr>) {
    for addr in addrs {
        msg.new_avp(avp::HOST_IP_ADDRESS, avp::MBIT, 0, AvpData::Address(addr));
    }
}

fn add_product(msg: &mut Message, settings: &Settings) {
    msg.new_avp(avp::VENDOR_ID, avp::MBIT, 0, AvpData::Unsigned32(settings.vendor_id));
    msg.new_avp(
        avp::PRODUCT_NAME,
        0,
        0,
        AvpData::Utf8String(settings.product_name.clone()),
    );
}

fn application_avp(app: &SupportedApp) -> Avp {
    let code = match app.app_type {
        AppType::Auth => avp::AUTH_APPLICATION_ID,
        AppType::Acct => avp::ACCT_APPLICATION_ID,
    };
    let id = Avp::new(code, avp::MBIT, 0, AvpData::Unsigned32(app.id));
    if !app.is_vendor_specific() {
        return id;
    }
    Avp::new(
        avp::VENDOR_SPECIFIC_APPLICATION_ID,
        avp::MBIT,
        0,
        AvpData::Grouped(vec![
            Avp::new(avp::VENDOR_ID, avp::MBIT, 0, AvpData::Unsigned32(app.vendor)),
            id,
        ]),
    )
}

/// Supported-Vendor-Id per distinct vendor, then one application AVP per app.
fn add_applications(msg: &mut Message, apps: &[SupportedApp]) {
    let mut vendors: Vec<u32> = Vec::new();
    for app in apps.iter().filter(|a| a.is_vendor_specific()) {
        if !vendors.contains(&app.vendor) {
            vendors.push(app.vendor);
        }
    }
    for vendor in vendors {
        msg.new_avp(avp::SUPPORTED_VENDOR_ID, avp::MBIT, 0, AvpData::Unsigned32(vendor));
    }
    for app in apps {
        msg.add_avp(application_avp(app));
    }
}

fn add_firmware(msg: &mut Message, settings: &Settings) {
    if let Some(rev) = settings.firmware_revision() {
        msg.new_avp(avp::FIRMWARE_REVISION, 0, 0, AvpData::Unsigned32(rev));
    }
}

fn success_cea(
    settings: &Settings,
    apps: &[SupportedApp],
    conn: &ConnRef,
    cer: &Message,
) -> Message {
    let mut cea = cer.answer(result_code::SUCCESS);
    add_identity(&mut cea, settings);
    if settings.host_ip_addresses.is_empty() {
        add_host_addresses(&mut cea, conn.local_addr().map(|a| a.ip()));
    } else {
        add_host_addresses(&mut cea, settings.host_ip_addresses.iter().copied());
    }
    add_product(&mut cea, settings);
    match settings.origin_state_id() {
        Some(id) => {
            cea.new_avp(avp::ORIGIN_STATE_ID, avp::MBIT, 0, AvpData::Unsigned32(id));
        },
        None => {
            if let Some(state) = cer.find_avp(avp::ORIGIN_STATE_ID) {
                cea.add_avp(state.clone());
            }
        },
    }
    add_applications(&mut cea, apps);
    add_firmware(&mut cea, settings);
    cea
}

fn failure_cea(settings: &Settings, cer: &Message, err: &SmError) -> Message {
    let mut cea = cer.answer(err.result_code());
    add_identity(&mut cea, settings);
    cea.new_avp(avp::ERROR_MESSAGE, 0, 0, AvpData::Utf8String(err.to_string()));
    if let SmError::MissingAvp { code, .. } = err {
        cea.new_avp(
            avp::FAILED_AVP,
            avp::MBIT,
            0,
            AvpData::Grouped(vec![Avp::new(*code, avp::MBIT, 0, AvpData::OctetString(Vec::new()))]),
        );
    }
    cea
}

/// CER carrying the local identity and applications, for nodes that
/// initiate the handshake.
pub(crate) fn capabilities_request(
    settings: &Settings,
    apps: &[SupportedApp],
    hop_by_hop_id: u32,
    end_to_end_id: u32,
) -> Message {
    let mut cer = Message::request(CAPABILITIES_EXCHANGE, 0, hop_by_hop_id, end_to_end_id);
    add_identity(&mut cer, settings);
    add_host_addresses(&mut cer, settings.host_ip_addresses.iter().copied());
    add_product(&mut cer, settings);
    if let Some(id) = settings.origin_state_id() {
        cer.new_avp(avp::ORIGIN_STATE_ID, avp::MBIT, 0, AvpData::Unsigned32(id));
    }
    add_applications(&mut cer, apps);
    add_firmware(&mut cer, settings);
    cer
}
