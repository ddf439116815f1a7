// src/profile.rs
use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

const SNOWFLAKE_HOST_SUFFIX: &str = ".snowflakecomputing.com";

/// Credentials for one warehouse login. Held in memory only.
#[derive(Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionProfile {
    pub account: String,
    pub user: String,
    pub password: String,
    pub role: String,
    pub warehouse: String,
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .finish()
    }
}

impl ConnectionProfile {
    /// Reads a JSON credentials file (`account`, `user`, `password`, `role`,
    /// `warehouse`). Unknown keys are ignored.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read credentials file {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Invalid credentials file {}", path.display()))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let profile: Self = serde_json::from_str(content)?;
        Ok(profile)
    }

    /// Names of the fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("account", &self.account),
            ("user", &self.user),
            ("password", &self.password),
            ("role", &self.role),
            ("warehouse", &self.warehouse),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }

    /// Presence check only; the warehouse decides whether values are right.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            bail!("Connection parameters are invalid: missing {}", missing.join(", "));
        }
        Ok(())
    }

    pub fn host(&self) -> String {
        let account = self.account.trim();
        if account.to_ascii_lowercase().ends_with(SNOWFLAKE_HOST_SUFFIX) {
            account.to_string()
        } else {
            format!("{account}{SNOWFLAKE_HOST_SUFFIX}")
        }
    }

    /// ODBC connection string for `driver`. Every value is brace-quoted so
    /// `;` and `}` inside a password cannot break the attribute list.
    pub fn connection_string(&self, driver: &str) -> String {
        [
            ("Driver", driver.to_string()),
            ("Server", self.host()),
            ("UID", self.user.trim().to_string()),
            ("PWD", self.password.clone()),
            ("Role", self.role.trim().to_string()),
            ("Warehouse", self.warehouse.trim().to_string()),
        ]
        .iter()
        .map(|(k, v)| format!("{k}={}", odbc_brace(v)))
        .collect::<Vec<_>>()
        .join(";")
    }
}

fn odbc_brace(value: &str) -> String {
    format!("{{{}}}", value.replace('}', "}}"))
}
