//! Main settings tree

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the local configuration endpoint
    #[serde(default = "default_config_url")]
    pub config_url: String,

    /// System prompt seeded into every fresh transcript
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Speech service configuration
    #[serde(default)]
    pub speech: SpeechSettings,

    /// Chat completion endpoint configuration
    #[serde(default)]
    pub openai: OpenAiSettings,

    /// Optional retrieval-augmentation (cognitive search) configuration
    #[serde(default)]
    pub search: SearchSettings,

    /// Chat request tuning and quick replies
    #[serde(default)]
    pub chat: ChatTuning,

    /// Liveness monitor intervals
    #[serde(default)]
    pub monitor: MonitorSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_url: default_config_url(),
            prompt: default_prompt(),
            speech: SpeechSettings::default(),
            openai: OpenAiSettings::default(),
            search: SearchSettings::default(),
            chat: ChatTuning::default(),
            monitor: MonitorSettings::default(),
        }
    }
}

fn default_config_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_prompt() -> String {
    "You are a helpful AI assistant.".to_string()
}

/// Speech service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSettings {
    /// Service region, e.g. `westeurope`
    #[serde(default)]
    pub region: String,
    /// Subscription key
    #[serde(default)]
    pub api_key: String,
    /// Synthesis voice
    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,
    /// Recognition locales
    #[serde(default = "default_stt_locales")]
    pub stt_locales: Vec<String>,
    /// Avatar persona
    #[serde(default = "default_avatar_character")]
    pub avatar_character: String,
    /// Avatar rendering style
    #[serde(default = "default_avatar_style")]
    pub avatar_style: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            region: String::new(),
            api_key: String::new(),
            tts_voice: default_tts_voice(),
            stt_locales: default_stt_locales(),
            avatar_character: default_avatar_character(),
            avatar_style: default_avatar_style(),
        }
    }
}

fn default_tts_voice() -> String {
    "en-US-JennyNeural".to_string()
}

fn default_stt_locales() -> Vec<String> {
    vec!["en-US".to_string()]
}

fn default_avatar_character() -> String {
    "lisa".to_string()
}

fn default_avatar_style() -> String {
    "casual-sitting".to_string()
}

/// Chat completion endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSettings {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    #[serde(default)]
    pub endpoint: String,
    /// API key (sent as the `api-key` header)
    #[serde(default)]
    pub api_key: String,
    /// Deployment name
    #[serde(default)]
    pub deployment: String,
    /// API version query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: String::new(),
            api_version: default_api_version(),
        }
    }
}

fn default_api_version() -> String {
    "2023-06-01-preview".to_string()
}

/// Retrieval-augmentation settings; all three fields must be present for
/// the extensions chat endpoint to be used
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub index_name: String,
}

impl SearchSettings {
    /// Retrieval is enabled only when endpoint, key and index are all set
    pub fn enabled(&self) -> bool {
        !self.endpoint.is_empty() && !self.key.is_empty() && !self.index_name.is_empty()
    }
}

/// Chat request tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTuning {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Speak a canned phrase while a retrieval-augmented answer is produced
    #[serde(default)]
    pub enable_quick_reply: bool,
    #[serde(default = "default_quick_replies")]
    pub quick_replies: Vec<String>,
}

impl Default for ChatTuning {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            enable_quick_reply: false,
            quick_replies: default_quick_replies(),
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    800
}

fn default_top_p() -> f32 {
    0.95
}

fn default_quick_replies() -> Vec<String> {
    vec![
        "Let me take a look.".to_string(),
        "Let me check.".to_string(),
        "One moment, please.".to_string(),
    ]
}

/// Liveness monitor intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Polling interval for both checks, seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Window between the two playback-position samples, seconds
    #[serde(default = "default_hang_window")]
    pub hang_window_secs: u64,
    /// Idle teardown threshold, seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            hang_window_secs: default_hang_window(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

fn default_poll_interval() -> u64 {
    2
}

fn default_hang_window() -> u64 {
    2
}

fn default_idle_timeout() -> u64 {
    15
}

impl Settings {
    /// Validate settings after all layers have been applied
    ///
    /// The speech and chat credentials must be present; everything else has
    /// usable defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.speech.region.is_empty() {
            return Err(ConfigError::Validation("speech.region is not set".into()));
        }
        if self.speech.api_key.is_empty() {
            return Err(ConfigError::Validation("speech.api_key is not set".into()));
        }
        if self.openai.endpoint.is_empty() {
            return Err(ConfigError::Validation("openai.endpoint is not set".into()));
        }
        if self.openai.api_key.is_empty() {
            return Err(ConfigError::Validation("openai.api_key is not set".into()));
        }
        if self.openai.deployment.is_empty() {
            return Err(ConfigError::Validation(
                "openai.deployment is not set".into(),
            ));
        }
        Ok(())
    }
}

/// Load settings from files and environment
///
/// Priority: env vars > `config/{env}.yaml` > `config/default.yaml` > defaults.
/// Both files are optional; the remote config bag is merged separately.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder().add_source(File::with_name("config/default").required(false));

    if let Some(env) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env)).required(false));
    }

    let config = builder
        .add_source(Environment::with_prefix("AVATAR_CHAT").separator("__"))
        .build()?;

    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.speech.tts_voice, "en-US-JennyNeural");
        assert_eq!(settings.speech.avatar_character, "lisa");
        assert_eq!(settings.monitor.idle_timeout_secs, 15);
        assert_eq!(settings.monitor.hang_window_secs, 2);
        assert!(!settings.chat.enable_quick_reply);
    }

    #[test]
    fn test_search_enabled_requires_all_fields() {
        let mut search = SearchSettings::default();
        assert!(!search.enabled());
        search.endpoint = "https://search.example.net".to_string();
        search.key = "key".to_string();
        assert!(!search.enabled());
        search.index_name = "docs".to_string();
        assert!(search.enabled());
    }

    #[test]
    fn test_validate_rejects_missing_credentials() {
        let settings = Settings::default();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.speech.region = "westeurope".to_string();
        settings.speech.api_key = "speech-key".to_string();
        settings.openai.endpoint = "https://r.openai.azure.com".to_string();
        settings.openai.api_key = "chat-key".to_string();
        settings.openai.deployment = "gpt-4o".to_string();
        assert!(settings.validate().is_ok());
    }
}
