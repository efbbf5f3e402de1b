use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::answer::format_answer;
use crate::chat::ChatTransport;
use crate::config::ChatConfig;
use crate::credential::CredentialStore;
use crate::engine::QueryEngine;
use crate::html::html_to_text;

/// What a single tick decided to do.
///
/// Failures are values, not control flow: the loop logs them, sleeps the
/// fixed interval and keeps running regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No bearer token yet; nothing was fetched.
    AwaitingCredential,
    /// Fetch failed; the latest message stays eligible for the next tick.
    FetchFailed,
    /// The thread has no messages.
    NoMessages,
    /// Latest message was authored by the bridge itself; recorded so it is
    /// never re-evaluated, not answered.
    SkippedOwn,
    /// Latest message was already handled on an earlier tick.
    AlreadySeen,
    /// A reply was posted.
    Replied,
    /// The engine failed; the message is consumed and gets no reply.
    EngineFailed,
    /// The reply could not be delivered; the message stays consumed.
    PostFailed,
}

/// The poll/dedup/ask/post state machine.
///
/// Exactly one fetch/process/post sequence runs per tick, and only the
/// single most recent message is ever considered; anything older that
/// arrived between ticks is skipped by design.
pub struct DispatchLoop {
    credentials: Arc<CredentialStore>,
    chat: Arc<dyn ChatTransport>,
    engine: Arc<dyn QueryEngine>,
    omit_user_id: String,
    poll_interval: Duration,
    /// Id of the last message this loop decided not to look at again.
    last_processed: Option<String>,
}

impl DispatchLoop {
    pub fn new(
        credentials: Arc<CredentialStore>,
        chat: Arc<dyn ChatTransport>,
        engine: Arc<dyn QueryEngine>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            credentials,
            chat,
            engine,
            omit_user_id: config.omit_user_id.clone(),
            poll_interval: config.poll_interval(),
            last_processed: None,
        }
    }

    /// Run forever, one tick per poll interval. Stops only with the process.
    pub async fn run(mut self) {
        info!(
            "Dispatch loop started (poll interval {}s)",
            self.poll_interval.as_secs()
        );
        loop {
            self.tick().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One poll-process-reply cycle.
    pub async fn tick(&mut self) -> TickOutcome {
        let Some(token) = self.credentials.get() else {
            info!("Access token not set, waiting for login...");
            return TickOutcome::AwaitingCredential;
        };

        let msg = match self.chat.fetch_latest(&token).await {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                info!("No messages in chat");
                return TickOutcome::NoMessages;
            }
            Err(e) => {
                // Not recorded as processed: a transient fetch failure must
                // not silently drop a real message.
                error!("Failed to fetch messages: {e}");
                return TickOutcome::FetchFailed;
            }
        };

        if msg.sender_id.as_deref() == Some(self.omit_user_id.as_str()) {
            warn!("Skipping message {} from omitted sender", msg.id);
            self.last_processed = Some(msg.id);
            return TickOutcome::SkippedOwn;
        }

        if self.last_processed.as_deref() == Some(msg.id.as_str()) {
            debug!("No new message");
            return TickOutcome::AlreadySeen;
        }

        // Consume the message before any downstream work: an engine or post
        // failure forgoes this reply rather than re-asking a poisonous
        // question every tick.
        self.last_processed = Some(msg.id.clone());

        let question = html_to_text(&msg.body_html);
        info!("New message: {question}");

        let payload = match self.engine.ask(&question).await {
            Ok(payload) => payload,
            Err(e) => {
                error!("Engine query failed: {e}");
                return TickOutcome::EngineFailed;
            }
        };

        let reply = format_answer(&payload);
        info!("Replying with: {}", reply.log_text);

        match self.chat.post_html(&token, &reply.html_body).await {
            Ok(()) => TickOutcome::Replied,
            Err(e) => {
                error!("Failed to post reply: {e}");
                TickOutcome::PostFailed
            }
        }
    }
}
