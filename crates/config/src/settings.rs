// Application settings
// Loaded from ~/.config/docforge/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Cap on retained undo snapshots per history; 0 = unbounded.
    #[serde(rename = "history.limit")]
    pub history_limit: usize,

    /// Base URL of the template service (discovery + generation).
    #[serde(rename = "service.url")]
    pub service_url: String,

    /// Default instructions sent with a discovery request.
    #[serde(rename = "discovery.instructions")]
    pub default_instructions: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            history_limit: 100,
            service_url: "http://localhost:8000".to_string(),
            default_instructions:
                "Identify key editable fields that users would want to customize or change."
                    .to_string(),
        }
    }
}

impl Settings {
    /// Load settings from disk, falling back to defaults on a missing or
    /// unreadable file. A corrupt file is not an error either — users can
    /// fix it without being locked out.
    pub fn load() -> Self {
        let Some(path) = settings_path() else {
            return Self::default();
        };
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Best-effort save; IO failures are reported, not fatal.
    pub fn save(&self) -> Result<(), String> {
        let Some(path) = settings_path() else {
            return Err("no config directory available".to_string());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(&path, json).map_err(|e| e.to_string())
    }
}

/// Path to the settings file: `<config dir>/docforge/settings.json`.
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("docforge").join("settings.json"))
}
