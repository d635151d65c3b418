//! Application dictionary.
//!
//! A [`Dictionary`] enumerates the applications a node knows about, in
//! declaration order. It is built explicitly and handed to the
//! [`StateMachine`](crate::StateMachine); there is no process-wide default.
//!
//! ```toml
//! [[application]]
//! id = 16777251
//! name = "TGPP S6A"
//! type = "auth"
//!
//! [[application.vendor]]
//! id = 10415
//! name = "TGPP"
//!
//! [[application.command]]
//! code = 316
//! short = "UL"
//! name = "Update-Location"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SmError};

/// Application type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    /// Authentication/authorization application
    Auth,
    /// Accounting application
    Acct,
}

impl AppType {
    /// Dictionary name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Acct => "acct",
        }
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AppType {
    type Err = SmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auth" => Ok(Self::Auth),
            "acct" => Ok(Self::Acct),
            _ => Err(SmError::Config(format!("unknown application type: {s}"))),
        }
    }
}

/// Vendor qualifying an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    /// Vendor id (IANA enterprise number)
    pub id: u32,
    /// Vendor name, matched by vendor-qualified filters
    pub name: String,
}

impl Vendor {
    /// Create a vendor
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

/// Command defined by an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Command code
    pub code: u32,
    /// Short name without the request/answer suffix, e.g. `UL`
    pub short: String,
    /// Long name, e.g. `Update-Location`
    #[serde(default)]
    pub name: String,
}

impl Command {
    /// Create a command
    pub fn new(code: u32, short: &str, name: &str) -> Self {
        Self {
            code,
            short: short.to_string(),
            name: name.to_string(),
        }
    }

    /// Request short name, e.g. `ULR`
    pub fn request_name(&self) -> String {
        format!("{}R", self.short)
    }

    /// Answer short name, e.g. `ULA`
    pub fn answer_name(&self) -> String {
        format!("{}A", self.short)
    }
}

/// Dictionary application entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    /// Application id
    pub id: u32,
    /// Application name
    #[serde(default)]
    pub name: String,
    /// Application type
    #[serde(rename = "type")]
    pub app_type: AppType,
    /// Vendors, first one is authoritative
    #[serde(default, rename = "vendor")]
    pub vendors: Vec<Vendor>,
    /// Commands of this application
    #[serde(default, rename = "command")]
    pub commands: Vec<Command>,
}

impl App {
    /// Create an application without vendors
    pub fn new(id: u32, name: &str, app_type: AppType) -> Self {
        Self {
            id,
            name: name.to_string(),
            app_type,
            vendors: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Add a vendor
    pub fn with_vendor(mut self, id: u32, name: &str) -> Self {
        self.vendors.push(Vendor::new(id, name));
        self
    }

    /// Add a command
    pub fn with_command(mut self, code: u32, short: &str, name: &str) -> Self {
        self.commands.push(Command::new(code, short, name));
        self
    }

    /// First vendor, if any
    pub fn vendor(&self) -> Option<&Vendor> {
        self.vendors.first()
    }
}

/// Ordered set of known applications
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    #[serde(default, rename = "application")]
    apps: Vec<App>,
}

impl Dictionary {
    /// Create from applications, keeping their order
    pub fn new(apps: Vec<App>) -> Self {
        Self { apps }
    }

    /// Append an application
    pub fn with_app(mut self, app: App) -> Self {
        self.apps.push(app);
        self
    }

    /// Applications in declaration order
    pub fn apps(&self) -> &[App] {
        &self.apps
    }

    /// Commands of all applications, in declaration order
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.apps.iter().flat_map(|app| app.commands.iter())
    }

    /// Number of applications
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Parse a TOML dictionary document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML dictionary file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SmError::Config(format!("Failed to read dictionary {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_from_toml_keeps_order() {
        let toml = r#"
            [[application]]
            id = 0
            name = "Base"
            type = "auth"

            [[application]]
            id = 3
            name = "Base Accounting"
            type = "acct"

            [[application]]
            id = 16777251
            name = "TGPP S6A"
            type = "auth"

            [[application.vendor]]
            id = 10415
            name = "TGPP"

            [[application.command]]
            code = 316
            short = "UL"
            name = "Update-Location"
        "#;

        let dict = Dictionary::from_toml_str(toml).unwrap();
        let ids: Vec<u32> = dict.apps().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![0, 3, 16777251]);
        assert_eq!(dict.apps()[1].app_type, AppType::Acct);
        assert_eq!(dict.apps()[2].vendor(), Some(&Vendor::new(10415, "TGPP")));
        assert!(dict.apps()[0].vendor().is_none());

        let commands: Vec<&Command> = dict.commands().collect();
        assert_eq!(commands, vec![&Command::new(316, "UL", "Update-Location")]);
        assert_eq!(commands[0].request_name(), "ULR");
        assert_eq!(commands[0].answer_name(), "ULA");
    }

    #[test]
    fn test_unknown_app_type_rejected() {
        let toml = r#"
            [[application]]
            id = 9
            type = "bogus"
        "#;
        assert!(matches!(
            Dictionary::from_toml_str(toml),
            Err(SmError::Config(_))
        ));
        assert!("bogus".parse::<AppType>().is_err());
        assert_eq!("ACCT".parse::<AppType>().unwrap(), AppType::Acct);
    }

    #[test]
    fn test_missing_file() {
        let err = Dictionary::from_file("/nonexistent/dictionary.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read dictionary"));
    }
}
