//! On-disk session state for the CLI.
//!
//! The whole engine session (registry, overlays, histories, selections)
//! serializes into one JSON file, plus enough source bookkeeping to warn
//! when a loaded document drifted on disk between runs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use docforge_engine::Session;

/// Where a session document came from, with the content hash recorded at
/// load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub name: String,
    pub path: PathBuf,
    pub hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionFile {
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    pub session: Session,
}

impl SessionFile {
    pub fn with_session(session: Session) -> Self {
        Self {
            saved_at: Utc::now(),
            sources: Vec::new(),
            session,
        }
    }

    /// Load a session file, or start fresh if it does not exist yet.
    /// A present-but-unreadable file is an error, not a silent reset.
    pub fn load_or_new(path: &Path, history_limit: usize) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::with_session(Session::with_history_limit(history_limit)));
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        let file: SessionFile = serde_json::from_str(&contents)
            .map_err(|e| format!("cannot parse {}: {}", path.display(), e))?;
        file.warn_on_drift();
        Ok(file)
    }

    pub fn save(&mut self, path: &Path) -> Result<(), String> {
        self.saved_at = Utc::now();
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| format!("cannot write {}: {}", path.display(), e))
    }

    /// Remember where a document came from. Re-loading a name replaces its
    /// entry.
    pub fn record_source(&mut self, name: &str, path: PathBuf, hash: String) {
        self.sources.retain(|s| s.name != name);
        self.sources.push(SourceRef {
            name: name.to_string(),
            path,
            hash,
        });
    }

    fn warn_on_drift(&self) {
        for source in &self.sources {
            let Ok(bytes) = fs::read(&source.path) else {
                continue;
            };
            let hash = blake3::hash(&bytes).to_hex().to_string();
            if hash != source.hash {
                warn!(
                    "document '{}' changed on disk since it was loaded ({})",
                    source.name,
                    source.path.display()
                );
            }
        }
    }
}
