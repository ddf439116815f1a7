// src/config.rs
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "StageFrost.toml";
pub const DEFAULT_DRIVER: &str = "SnowflakeDSIIDriver";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// ODBC driver name used in the connection string.
    pub driver: String,
    /// JSON credentials file offered in the sidebar.
    pub credentials_file: Option<PathBuf>,
    pub stop_on_first_failure: bool,
    pub log_level: String,
    pub colors: ColorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver: DEFAULT_DRIVER.to_string(),
            credentials_file: None,
            stop_on_first_failure: true,
            log_level: "info".to_string(),
            colors: ColorConfig::default(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct ColorConfig {
    pub default_bg: [u8; 3],
    pub plain: [u8; 3],
    pub border: [u8; 3],
    pub border_focus: [u8; 3],
    pub header_row: [u8; 3],
    pub tab_active: [u8; 3],
    pub caret_fg: [u8; 3],
    pub caret_bg: [u8; 3],
    pub checked_fg: [u8; 3],
    pub status_fg: [u8; 3],
    pub success_fg: [u8; 3],
    pub info_fg: [u8; 3],
    pub warning_fg: [u8; 3],
    pub error_fg: [u8; 3],
    pub help_bg: [u8; 3],
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            default_bg: [22, 22, 22],
            plain: [200, 200, 200],
            border: [84, 84, 109],
            border_focus: [126, 156, 216],
            header_row: [230, 195, 132],
            tab_active: [210, 126, 153],
            caret_fg: [22, 22, 22],
            caret_bg: [126, 156, 216],
            checked_fg: [152, 187, 108],
            status_fg: [120, 120, 145],
            success_fg: [152, 187, 108],
            info_fg: [127, 180, 202],
            warning_fg: [255, 160, 102],
            error_fg: [255, 93, 98],
            help_bg: [30, 31, 40],
        }
    }
}

impl Config {
    /// Directory the executable lives in; config and log files sit beside it.
    pub fn data_dir() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
            .and_then(|p| std::fs::canonicalize(p).ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn default_path() -> PathBuf {
        Self::data_dir().join(CONFIG_FILE_NAME)
    }

    /// A missing file yields the defaults; a broken one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
