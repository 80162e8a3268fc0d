use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the category store when no location is configured.
pub const STORE_FILE: &str = "config.json";
/// File name of the settings file looked up beside the executable.
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Settings {
    /// Location of the category store. If `None`, `config.json` beside the
    /// executable is used.
    #[serde(default)]
    pub store_path: Option<String>,
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional file receiving log output instead of stderr.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Category launched by `--startup`. Falls back to `default`.
    #[serde(default)]
    pub startup_category: Option<String>,
}

/// Directory holding the running executable, or the working directory when
/// it cannot be determined.
pub fn app_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Effective location of the category store.
    pub fn store_path(&self) -> PathBuf {
        match &self.store_path {
            Some(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => app_dir().join(STORE_FILE),
        }
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_file
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    }
}
