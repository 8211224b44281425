use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use research_core::OrchestratorSettings;
use research_engine::ClientSettings;
use research_logging::research_info;
use serde::{Deserialize, Serialize};

/// Settings file looked up in the working directory when `--config` is absent.
pub const DEFAULT_SETTINGS_FILE: &str = "research.ron";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

/// Contents of `research.ron`. Every field is optional; missing ones keep the
/// client and orchestrator defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub base_url: Option<String>,
    pub csrf_token: Option<String>,
    pub conversation_id: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub submit_timeout_secs: Option<u64>,
    pub job_deadline_secs: Option<u64>,
    pub max_consecutive_errors: Option<u32>,
    pub settle_grace_ms: Option<u64>,
}

impl AppSettings {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                research_info!("No settings file at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let settings = ron::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        research_info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn client_settings(&self) -> ClientSettings {
        let mut client = ClientSettings::default();
        if let Some(base_url) = &self.base_url {
            client.base_url = base_url.clone();
        }
        if self.csrf_token.is_some() {
            client.csrf_token = self.csrf_token.clone();
        }
        if let Some(secs) = self.connect_timeout_secs {
            client.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.request_timeout_secs {
            client.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = self.submit_timeout_secs {
            client.submit_deadline = Some(Duration::from_secs(secs));
        }
        client
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        let mut settings = OrchestratorSettings::default();
        if let Some(secs) = self.job_deadline_secs {
            settings.job_deadline = Duration::from_secs(secs);
        }
        if let Some(max) = self.max_consecutive_errors {
            settings.max_consecutive_errors = max.max(1);
        }
        if let Some(ms) = self.settle_grace_ms {
            settings.settle_grace = Duration::from_millis(ms);
        }
        settings
    }
}
