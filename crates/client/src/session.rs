//! Avatar session lifecycle
//!
//! One `AvatarSession` covers one connected avatar: relay token, speech
//! synthesizer, chat client, transcript and liveness state. Reconnection is
//! always a full teardown followed by a fresh connect; there is no partial
//! repair of a degraded session.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use avatar_chat_config::Settings;
use avatar_chat_core::{AvatarSynthesizer, Message, PlaybackProbe, Result, Transcript};
use avatar_chat_llm::{ChatClient, ChatConfig, DataSource};
use avatar_chat_pipeline::{LivenessState, SpeakQueue};
use avatar_chat_transport::{
    fetch_relay_token, IceServerConfig, RestSynthesizer, SynthesizerConfig,
};

pub struct AvatarSession {
    pub(crate) settings: Settings,
    pub(crate) chat: Arc<ChatClient>,
    pub(crate) synthesizer: Arc<RestSynthesizer>,
    pub(crate) queue: Arc<SpeakQueue>,
    pub(crate) liveness: Arc<LivenessState>,
    pub(crate) transcript: Mutex<Transcript>,
    ice: IceServerConfig,
}

impl AvatarSession {
    /// Fetch a relay token, build the transport and mark the session active
    pub async fn connect(settings: Settings) -> Result<Arc<Self>> {
        let token =
            fetch_relay_token(&settings.speech.region, &settings.speech.api_key).await?;
        let ice = IceServerConfig::from(token);
        info!(
            relay_urls = ice.urls.len(),
            character = %settings.speech.avatar_character,
            style = %settings.speech.avatar_style,
            "avatar relay negotiated"
        );

        let synthesizer = Arc::new(RestSynthesizer::new(SynthesizerConfig::new(
            &settings.speech.region,
            &settings.speech.api_key,
            &settings.speech.tts_voice,
        ))?);

        let data_source = settings.search.enabled().then(|| DataSource {
            endpoint: settings.search.endpoint.clone(),
            key: settings.search.key.clone(),
            index_name: settings.search.index_name.clone(),
        });
        let chat = Arc::new(ChatClient::new(ChatConfig {
            endpoint: settings.openai.endpoint.clone(),
            api_key: settings.openai.api_key.clone(),
            deployment: settings.openai.deployment.clone(),
            api_version: settings.openai.api_version.clone(),
            temperature: settings.chat.temperature,
            max_tokens: settings.chat.max_tokens,
            top_p: settings.chat.top_p,
            data_source,
        })?);

        let liveness = Arc::new(LivenessState::new());
        let queue = Arc::new(SpeakQueue::new(
            synthesizer.clone() as Arc<dyn avatar_chat_core::AvatarSynthesizer>,
            liveness.clone(),
        ));
        liveness.activate();

        let transcript = Mutex::new(Transcript::with_system_prompt(&settings.prompt));
        Ok(Arc::new(Self {
            settings,
            chat,
            synthesizer,
            queue,
            liveness,
            transcript,
            ice,
        }))
    }

    /// Cancel speech, close the synthesizer and mark the session inactive
    pub async fn disconnect(&self) {
        self.queue.cancel_all().await;
        self.synthesizer.close();
        self.liveness.deactivate();
        info!("session disconnected");
    }

    /// Stop the current utterance and drop everything queued behind it
    pub async fn stop_speaking(&self) {
        self.queue.cancel_all().await;
    }

    /// Cancel speech and reinstall the system prompt on an empty transcript
    pub async fn reset(&self) {
        self.queue.cancel_all().await;
        self.transcript.lock().reset(&self.settings.prompt);
        info!("transcript cleared");
    }

    pub fn liveness(&self) -> Arc<LivenessState> {
        self.liveness.clone()
    }

    /// Playback probe for the liveness monitor
    pub fn probe(&self) -> Arc<dyn PlaybackProbe> {
        self.synthesizer.clone()
    }

    pub fn ice_servers(&self) -> &IceServerConfig {
        &self.ice
    }

    pub fn is_active(&self) -> bool {
        self.liveness.is_active()
    }

    pub fn transcript_messages(&self) -> Vec<Message> {
        self.transcript.lock().messages().to_vec()
    }
}
