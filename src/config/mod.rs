//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - Builder methods (for embedding)
//!
//! [`Settings`] is read-only once handed to the
//! [`StateMachine`](crate::StateMachine). Mutating a copy while connections
//! are being served has no effect on the running state machine.

use std::net::IpAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SmError};

/// Environment variable prefix
const ENV_PREFIX: &str = "DIAM_";

/// Default capacity of each event queue
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// What an event queue does when it is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the event being pushed
    DropNewest,
    /// Discard the oldest queued event to make room
    #[default]
    DropOldest,
}

/// Error report and handshake notification queue settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Maximum queued events per queue (minimum 1)
    pub capacity: usize,
    /// Overflow behaviour
    pub overflow: OverflowPolicy,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_EVENT_CAPACITY,
            overflow: OverflowPolicy::default(),
        }
    }
}

/// Local identity and negotiation settings, used to build CEA and DWA
/// answers (and CER requests when this node initiates).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application filters; `None` advertises every dictionary application,
    /// an empty list advertises none
    pub supported_apps: Option<Vec<String>>,

    /// Origin-Host
    pub origin_host: String,

    /// Origin-Realm
    pub origin_realm: String,

    /// Vendor-Id
    pub vendor_id: u32,

    /// Product-Name
    pub product_name: String,

    /// Origin-State-Id. Not sent when unset or zero; a CEA then echoes the
    /// value from the peer's CER, if any.
    pub origin_state_id: Option<u32>,

    /// Firmware-Revision. Not sent when unset or zero.
    pub firmware_revision: Option<u32>,

    /// Host-IP-Address values. When empty, the connection's local address
    /// is used.
    pub host_ip_addresses: Vec<IpAddr>,

    /// Deprecated: use `host_ip_addresses`. Promoted into the list when the
    /// list is empty.
    pub host_ip_address: Option<IpAddr>,

    /// Event queues
    pub events: EventConfig,
}

impl Settings {
    /// Create settings with the mandatory identity
    pub fn new(origin_host: &str, origin_realm: &str) -> Self {
        Self {
            origin_host: origin_host.to_string(),
            origin_realm: origin_realm.to_string(),
            ..Default::default()
        }
    }

    /// Set Vendor-Id
    pub fn with_vendor_id(mut self, vendor_id: u32) -> Self {
        self.vendor_id = vendor_id;
        self
    }

    /// Set Product-Name
    pub fn with_product_name(mut self, name: &str) -> Self {
        self.product_name = name.to_string();
        self
    }

    /// Restrict advertised applications
    pub fn with_supported_apps<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_apps = Some(filters.into_iter().map(Into::into).collect());
        self
    }

    /// Set Origin-State-Id
    pub fn with_origin_state_id(mut self, id: u32) -> Self {
        self.origin_state_id = Some(id);
        self
    }

    /// Set Firmware-Revision
    pub fn with_firmware_revision(mut self, revision: u32) -> Self {
        self.firmware_revision = Some(revision);
        self
    }

    /// Add a Host-IP-Address
    pub fn with_host_ip_address(mut self, addr: IpAddr) -> Self {
        self.host_ip_addresses.push(addr);
        self
    }

    /// Set event queue settings
    pub fn with_events(mut self, events: EventConfig) -> Self {
        self.events = events;
        self
    }

    /// Origin-State-Id to send, if any
    pub fn origin_state_id(&self) -> Option<u32> {
        self.origin_state_id.filter(|id| *id != 0)
    }

    /// Firmware-Revision to send, if any
    pub fn firmware_revision(&self) -> Option<u32> {
        self.firmware_revision.filter(|rev| *rev != 0)
    }

    /// Fold the deprecated single address into the list
    pub fn normalized(mut self) -> Self {
        if self.host_ip_addresses.is_empty() {
            if let Some(addr) = self.host_ip_address {
                self.host_ip_addresses.push(addr);
            }
        }
        self
    }

    /// Check the mandatory identity fields
    pub fn validate(&self) -> Result<()> {
        if self.origin_host.trim().is_empty() {
            return Err(SmError::Config("origin_host must not be empty".to_string()));
        }
        if self.origin_realm.trim().is_empty() {
            return Err(SmError::Config("origin_realm must not be empty".to_string()));
        }
        Ok(())
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings.normalized())
    }

    /// Load settings from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| SmError::Config(format!("Failed to read config file: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Load settings from environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Overlay `DIAM_*` environment variables
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(host) = var("ORIGIN_HOST") {
            self.origin_host = host;
        }
        if let Some(realm) = var("ORIGIN_REALM") {
            self.origin_realm = realm;
        }
        if let Some(id) = var("VENDOR_ID") {
            if let Ok(id) = id.parse() {
                self.vendor_id = id;
            }
        }
        if let Some(name) = var("PRODUCT_NAME") {
            self.product_name = name;
        }
        if let Some(apps) = var("SUPPORTED_APPS") {
            self.supported_apps = Some(
                apps.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            );
        }
        self
    }
}
