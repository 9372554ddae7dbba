//! Streaming chat-completion client
//!
//! Works against the Azure OpenAI deployments endpoint, with an optional
//! cognitive-search data source that switches the request to the
//! `/extensions/chat/completions` variant and the response to its
//! per-message delta shape.

use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use avatar_chat_core::Message;

use crate::sse::RecordBuffer;
use crate::LlmError;

/// Inline citation markers emitted by retrieval-augmented replies, e.g. `[doc1]`
static DOC_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[doc(\d+)\]").unwrap());

/// Chat endpoint configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    /// API key (sent as the `api-key` header)
    pub api_key: String,
    /// Deployment name
    pub deployment: String,
    /// API version query parameter
    pub api_version: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token cap
    pub max_tokens: u32,
    /// Top-p sampling
    pub top_p: f32,
    /// Optional retrieval data source
    pub data_source: Option<DataSource>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: String::new(),
            api_version: "2023-06-01-preview".to_string(),
            temperature: 0.7,
            max_tokens: 800,
            top_p: 0.95,
            data_source: None,
        }
    }
}

/// Cognitive-search data source for retrieval-augmented chat
#[derive(Debug, Clone)]
pub struct DataSource {
    pub endpoint: String,
    pub key: String,
    pub index_name: String,
}

/// Incremental content fragment decoded from one stream record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatDelta {
    /// Assistant content fragment
    Assistant(String),
    /// Auxiliary retrieval annotation
    Tool(String),
}

/// Result of a completed stream
#[derive(Debug, Clone, Default)]
pub struct ChatOutcome {
    /// Full accumulated assistant reply
    pub reply: String,
    /// Retrieval annotation, if the stream carried one
    pub tool_content: Option<String>,
}

/// Outcome of parsing one `data:` record
enum ParsedRecord {
    Delta(ChatDelta),
    Done,
    Skip,
}

/// Streaming chat-completion client
pub struct ChatClient {
    client: Client,
    config: ChatConfig,
}

impl ChatClient {
    /// Create a new client
    pub fn new(config: ChatConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Configuration("chat API key is not set".into()));
        }

        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the chat completions URL
    ///
    /// The `/extensions` variant is used whenever a data source is configured.
    fn chat_url(&self) -> String {
        let base = format!(
            "{}/openai/deployments/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment
        );
        if self.config.data_source.is_some() {
            format!(
                "{}/extensions/chat/completions?api-version={}",
                base, self.config.api_version
            )
        } else {
            format!(
                "{}/chat/completions?api-version={}",
                base, self.config.api_version
            )
        }
    }

    fn request_body(&self, messages: &[Message]) -> ChatRequest<'_> {
        ChatRequest {
            messages: messages.to_vec(),
            stream: true,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
            data_sources: self.config.data_source.as_ref().map(|ds| {
                vec![DataSourceBody {
                    source_type: "AzureCognitiveSearch",
                    parameters: DataSourceParameters {
                        endpoint: &ds.endpoint,
                        key: &ds.key,
                        index_name: &ds.index_name,
                    },
                }]
            }),
        }
    }

    /// Stream a chat completion
    ///
    /// Each decoded content fragment is sent to `tx` as it arrives; the full
    /// accumulated reply (and tool annotation, if any) is returned once the
    /// stream ends. Individual records that fail to decode are logged and
    /// skipped; they do not abort the stream.
    pub async fn stream_chat(
        &self,
        messages: &[Message],
        tx: mpsc::Sender<ChatDelta>,
    ) -> Result<ChatOutcome, LlmError> {
        let url = self.chat_url();
        let response = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(&self.request_body(messages))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let byod = self.config.data_source.is_some();
        let mut outcome = ChatOutcome::default();
        let mut buffer = RecordBuffer::new();
        let mut stream = response.bytes_stream();

        'read: while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::Network(e.to_string()))?;

            for record in buffer.push(&chunk) {
                match parse_record(&record, byod) {
                    ParsedRecord::Delta(ChatDelta::Assistant(fragment)) => {
                        outcome.reply.push_str(&fragment);
                        if tx.send(ChatDelta::Assistant(fragment)).await.is_err() {
                            // Receiver gone: the caller stopped listening
                            break 'read;
                        }
                    }
                    ParsedRecord::Delta(ChatDelta::Tool(content)) => {
                        outcome.tool_content = Some(content.clone());
                        if tx.send(ChatDelta::Tool(content)).await.is_err() {
                            break 'read;
                        }
                    }
                    ParsedRecord::Done => break 'read,
                    ParsedRecord::Skip => {}
                }
            }
        }

        Ok(outcome)
    }
}

/// Decode one complete record into a delta
fn parse_record(record: &str, byod: bool) -> ParsedRecord {
    let Some(payload) = record.strip_prefix("data:") else {
        return ParsedRecord::Skip;
    };
    let payload = payload.trim();

    if payload == "[DONE]" {
        return ParsedRecord::Done;
    }

    let chunk: StreamChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping undecodable stream record");
            return ParsedRecord::Skip;
        }
    };

    let Some(choice) = chunk.choices.into_iter().next() else {
        return ParsedRecord::Skip;
    };

    if byod {
        let Some(message) = choice.messages.into_iter().next() else {
            return ParsedRecord::Skip;
        };
        let delta = message.delta;
        if delta.role.as_deref() == Some("tool") {
            return match delta.content {
                Some(content) => ParsedRecord::Delta(ChatDelta::Tool(content)),
                None => ParsedRecord::Skip,
            };
        }
        let mut token = delta.content.unwrap_or_default();
        if DOC_MARKER.is_match(&token) {
            token = DOC_MARKER.replace_all(&token, "").trim().to_string();
        }
        // A literal [DONE] content token is noise inside a retrieval
        // stream, not the record sentinel; later records still follow.
        if token == "[DONE]" {
            return ParsedRecord::Skip;
        }
        if token.is_empty() {
            return ParsedRecord::Skip;
        }
        ParsedRecord::Delta(ChatDelta::Assistant(token))
    } else {
        match choice.delta.and_then(|d| d.content) {
            Some(token) if !token.is_empty() => ParsedRecord::Delta(ChatDelta::Assistant(token)),
            _ => ParsedRecord::Skip,
        }
    }
}

// Wire types

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<Message>,
    stream: bool,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    #[serde(rename = "dataSources", skip_serializing_if = "Option::is_none")]
    data_sources: Option<Vec<DataSourceBody<'a>>>,
}

#[derive(Serialize)]
struct DataSourceBody<'a> {
    #[serde(rename = "type")]
    source_type: &'static str,
    parameters: DataSourceParameters<'a>,
}

#[derive(Serialize)]
struct DataSourceParameters<'a> {
    endpoint: &'a str,
    key: &'a str,
    #[serde(rename = "indexName")]
    index_name: &'a str,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<ContentDelta>,
    #[serde(default)]
    messages: Vec<ExtensionMessage>,
}

#[derive(Deserialize)]
struct ContentDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ExtensionMessage {
    delta: ExtensionDelta,
}

#[derive(Deserialize)]
struct ExtensionDelta {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
}
