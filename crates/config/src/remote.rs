//! Remote configuration bag
//!
//! The backend exposes `GET /api/config` returning a flat JSON object with
//! endpoint and key fields. It is treated as an opaque key-value bag: any
//! field may be absent or empty, and only non-empty values override the
//! file/env layers.

use serde::Deserialize;

use crate::{ConfigError, Settings};

/// Payload of `GET {config_url}/api/config`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteConfig {
    pub speech_region: String,
    pub speech_api_key: String,
    #[serde(rename = "azureOpenAIEndpoint")]
    pub azure_openai_endpoint: String,
    #[serde(rename = "azureOpenAIApiKey")]
    pub azure_openai_api_key: String,
    #[serde(rename = "azureOpenAIDeploymentName")]
    pub azure_openai_deployment_name: String,
    pub cognitive_search_endpoint: String,
    pub cognitive_search_key: String,
    pub cognitive_search_index: String,
}

/// Fetch the remote config bag
///
/// Failure here is fatal to startup; the caller does not proceed to
/// initialize the session without it.
pub async fn fetch_remote(config_url: &str) -> Result<RemoteConfig, ConfigError> {
    let url = format!("{}/api/config", config_url.trim_end_matches('/'));
    tracing::info!(%url, "Fetching remote configuration");

    let response = reqwest::get(&url).await?;
    if !response.status().is_success() {
        return Err(ConfigError::Remote(format!(
            "{} returned {}",
            url,
            response.status()
        )));
    }

    let remote: RemoteConfig = response.json().await?;
    tracing::info!(
        has_speech_key = !remote.speech_api_key.is_empty(),
        has_chat_key = !remote.azure_openai_api_key.is_empty(),
        retrieval = !remote.cognitive_search_index.is_empty(),
        "Remote configuration received"
    );
    Ok(remote)
}

impl Settings {
    /// Merge non-empty remote fields over the file/env values
    pub fn apply_remote(&mut self, remote: &RemoteConfig) {
        fn merge(target: &mut String, value: &str) {
            if !value.is_empty() {
                *target = value.to_string();
            }
        }

        merge(&mut self.speech.region, &remote.speech_region);
        merge(&mut self.speech.api_key, &remote.speech_api_key);
        merge(&mut self.openai.endpoint, &remote.azure_openai_endpoint);
        merge(&mut self.openai.api_key, &remote.azure_openai_api_key);
        merge(
            &mut self.openai.deployment,
            &remote.azure_openai_deployment_name,
        );
        merge(&mut self.search.endpoint, &remote.cognitive_search_endpoint);
        merge(&mut self.search.key, &remote.cognitive_search_key);
        merge(&mut self.search.index_name, &remote.cognitive_search_index);
    }
}
