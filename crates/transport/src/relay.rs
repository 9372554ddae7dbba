//! Relay token acquisition
//!
//! Before the avatar's media channel can be negotiated, a short-lived relay
//! token must be fetched from the speech service. The token carries the TURN
//! relay URLs and the username/password pair to authenticate against them.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::TransportError;

/// Relay token as returned by the speech service
#[derive(Debug, Clone, Deserialize)]
pub struct RelayToken {
    #[serde(rename = "Urls")]
    pub urls: Vec<String>,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Password")]
    pub password: String,
}

/// ICE server entry derived from a relay token, ready to hand to a
/// peer-connection builder
#[derive(Debug, Clone)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

impl From<RelayToken> for IceServerConfig {
    fn from(token: RelayToken) -> Self {
        Self {
            urls: token.urls,
            username: token.username,
            credential: token.password,
        }
    }
}

/// Fetch a relay token for the given speech region
pub async fn fetch_relay_token(region: &str, api_key: &str) -> Result<RelayToken, TransportError> {
    let url = format!(
        "https://{region}.tts.speech.microsoft.com/cognitiveservices/avatar/relay/token/v1"
    );
    debug!(%region, "fetching avatar relay token");

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    let response = client
        .get(&url)
        .header("Ocp-Apim-Subscription-Key", api_key)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(TransportError::Relay(format!(
            "speech service returned {}",
            response.status()
        )));
    }

    let token: RelayToken = response
        .json()
        .await
        .map_err(|e| TransportError::Relay(format!("malformed token payload: {e}")))?;

    if token.urls.is_empty() {
        return Err(TransportError::Relay("token carried no relay urls".into()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_token_parses_service_payload() {
        let body = r#"{
            "Urls": ["turn:relay.example.com:3478"],
            "Username": "user-abc",
            "Password": "secret"
        }"#;
        let token: RelayToken = serde_json::from_str(body).unwrap();
        assert_eq!(token.urls, vec!["turn:relay.example.com:3478"]);
        assert_eq!(token.username, "user-abc");

        let ice: IceServerConfig = token.into();
        assert_eq!(ice.credential, "secret");
    }
}
