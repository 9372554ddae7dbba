//! One conversational turn
//!
//! A user query interrupts any ongoing speech, goes on the transcript, and
//! is answered by streaming the chat completion through the sentence
//! splitter into the speech queue. Tool content from retrieval-grounded
//! responses lands on the transcript ahead of the assistant reply, matching
//! the order the model produced them.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::sync::mpsc;
use tracing::debug;

use avatar_chat_core::{Error, Message, Result};
use avatar_chat_llm::ChatDelta;
use avatar_chat_pipeline::SentenceSplitter;

use crate::session::AvatarSession;

/// Trailing silence after a quick reply, leaving a beat before the answer
const QUICK_REPLY_SILENCE_MS: u64 = 2000;

impl AvatarSession {
    /// Run one user turn
    ///
    /// Returns the display text drained from the splitter's display buffer;
    /// the transcript stores the accumulated reply from the stream outcome.
    pub async fn handle_user_query(
        &self,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<String> {
        self.queue.cancel_all().await;

        let message = match image_url {
            Some(url) => Message::user_with_image(text, url),
            None => Message::user(text),
        };
        let messages = {
            let mut transcript = self.transcript.lock();
            transcript.push(message);
            transcript.messages().to_vec()
        };

        // Retrieval-grounded answers take noticeably longer to start, so a
        // canned acknowledgement covers the gap.
        if self.settings.search.enabled() && self.settings.chat.enable_quick_reply {
            if let Some(reply) = self
                .settings
                .chat
                .quick_replies
                .choose(&mut rand::thread_rng())
            {
                self.queue
                    .enqueue_with_silence(reply.clone(), QUICK_REPLY_SILENCE_MS);
            }
        }

        let (tx, mut rx) = mpsc::channel::<ChatDelta>(64);
        let chat = Arc::clone(&self.chat);
        let stream = tokio::spawn(async move { chat.stream_chat(&messages, tx).await });

        let mut splitter = SentenceSplitter::new();
        while let Some(delta) = rx.recv().await {
            if let ChatDelta::Assistant(fragment) = delta {
                if let Some(sentence) = splitter.push(&fragment) {
                    if !sentence.trim().is_empty() {
                        self.queue.enqueue(sentence);
                    }
                }
            }
        }

        let outcome = stream
            .await
            .map_err(|e| Error::Chat(format!("chat stream task failed: {e}")))??;

        if let Some(sentence) = splitter.finish() {
            if !sentence.trim().is_empty() {
                self.queue.enqueue(sentence);
            }
        }
        let display = splitter.take_display();

        {
            let mut transcript = self.transcript.lock();
            if let Some(tool_content) = &outcome.tool_content {
                transcript.push(Message::tool(tool_content.clone()));
            }
            transcript.push(Message::assistant(outcome.reply.clone()));
        }
        debug!(chars = outcome.reply.len(), "turn complete");

        Ok(display)
    }
}
