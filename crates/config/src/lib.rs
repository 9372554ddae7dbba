//! Configuration for the avatar chat client
//!
//! Settings are assembled in three layers, last one wins:
//! 1. `config/default.yaml` then `config/{env}.yaml` (optional files)
//! 2. `AVATAR_CHAT_*` environment variables
//! 3. the remote `GET {config_url}/api/config` key bag fetched at startup
//!
//! The remote fetch is fatal on failure: the application does not proceed
//! to initialize without it.

pub mod remote;
pub mod settings;

pub use remote::{fetch_remote, RemoteConfig};
pub use settings::{
    load_settings, ChatTuning, MonitorSettings, OpenAiSettings, SearchSettings, Settings,
    SpeechSettings,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Remote config fetch failed: {0}")]
    Remote(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

impl From<reqwest::Error> for ConfigError {
    fn from(err: reqwest::Error) -> Self {
        ConfigError::Remote(err.to_string())
    }
}
