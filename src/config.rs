use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Connection settings for the sync engine. TOML is the preferred format;
/// a legacy JSON file is converted on load where possible.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub base_url: String,
    pub ws_url: String,
    pub user_id: String,
    pub token: String,
}

impl Settings {
    fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("chat-sync.toml"))
    }

    fn legacy_json_path() -> Option<PathBuf> {
        let proj = directories::ProjectDirs::from("com", "example", "ChatSync")?;
        Some(proj.config_dir().join("state.json"))
    }

    pub fn load() -> Self {
        if let Some(path) = Self::toml_path() {
            if let Ok(text) = fs::read_to_string(&path) {
                if let Ok(settings) = toml::from_str::<Settings>(&text) {
                    return settings;
                }
            }
        }

        if let Some(legacy) = Self::legacy_json_path() {
            if let Ok(bytes) = fs::read(&legacy) {
                if let Ok(settings) = serde_json::from_slice::<Settings>(&bytes) {
                    let _ = settings.save();
                    return settings;
                }
            }
        }

        Settings::default()
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::toml_path()
            .ok_or_else(|| Error::Config("no config directory".into()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, toml)?;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        !self.base_url.is_empty() && !self.user_id.is_empty() && !self.token.is_empty()
    }
}
