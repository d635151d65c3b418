//! Locally supported applications.
//!
//! The applications a node advertises in its CEA are derived once, at
//! startup, from the [`Dictionary`] and the operator's filter list.
//!
//! Filters are either a bare match key (`"1"`, `"Charging Control"`) or a
//! vendor-qualified key (`"TGPP.TGPP S6A"`): the part before the first `.` is
//! the required vendor *name*, the part after it the application id or name.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dict::{App, AppType, Dictionary};

/// Separator between vendor name and match key.
const VENDOR_SEPARATOR: char = '.';

/// Application supported by this node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SupportedApp {
    /// Application id
    pub id: u32,
    /// Auth or Acct
    pub app_type: AppType,
    /// Vendor id, 0 when not vendor-specific
    pub vendor: u32,
}

impl SupportedApp {
    /// Is this application vendor-specific
    pub fn is_vendor_specific(&self) -> bool {
        self.vendor != 0
    }
}

impl From<&App> for SupportedApp {
    fn from(app: &App) -> Self {
        Self {
            id: app.id,
            app_type: app.app_type,
            vendor: app.vendor().map_or(0, |v| v.id),
        }
    }
}

/// One parsed filter string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFilter {
    /// Application id (decimal) or name
    pub key: String,
    /// Required vendor name
    pub vendor: Option<String>,
}

impl ApplicationFilter {
    /// Parse a filter string. Parts after the second one are ignored.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(VENDOR_SEPARATOR);
        let first = parts.next().unwrap_or_default();
        match parts.next() {
            Some(key) => Self {
                key: key.to_string(),
                vendor: Some(first.to_string()),
            },
            None => Self {
                key: first.to_string(),
                vendor: None,
            },
        }
    }
}

impl fmt::Display for ApplicationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.vendor {
            Some(vendor) => write!(f, "{vendor}{VENDOR_SEPARATOR}{}", self.key),
            None => f.write_str(&self.key),
        }
    }
}

/// Compile filter strings into match key -> vendor name (empty = any vendor).
///
/// `None` stays `None` (no filtering). A key given twice keeps the last
/// vendor requirement.
pub fn compute_app_filters(filters: Option<&[String]>) -> Option<HashMap<String, String>> {
    let filters = filters?;
    let mut compiled = HashMap::with_capacity(filters.len());
    for raw in filters {
        let filter = ApplicationFilter::parse(raw);
        compiled.insert(filter.key, filter.vendor.unwrap_or_default());
    }
    Some(compiled)
}

fn allowed_by_filters(app: &App, filters: Option<&HashMap<String, String>>) -> bool {
    let Some(filters) = filters else {
        return true;
    };
    let id = app.id.to_string();
    filters.iter().any(|(key, vendor)| {
        if *key != id && *key != app.name {
            return false;
        }
        vendor.is_empty() || app.vendor().is_some_and(|v| v.name == *vendor)
    })
}

/// Build the list of locally supported applications.
///
/// Application 0 (Base) is never included. Order follows the dictionary.
/// `Some(&[])` yields an empty list, unlike `None` which selects everything.
pub fn prepare_supported_apps(dict: &Dictionary, filters: Option<&[String]>) -> Vec<SupportedApp> {
    let compiled = compute_app_filters(filters);
    dict.apps()
        .iter()
        .filter(|app| app.id != 0 && allowed_by_filters(app, compiled.as_ref()))
        .map(SupportedApp::from)
        .collect()
}
