use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::answer::AnswerPayload;
use crate::config::EngineConfig;
use crate::error::EngineError;

/// Opaque natural-language query capability: text in, answer out.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn ask(&self, query: &str) -> Result<AnswerPayload, EngineError>;
}

// Genie wire shapes.

#[derive(Debug, Deserialize)]
struct SpaceList {
    #[serde(default)]
    spaces: Vec<Space>,
}

#[derive(Debug, Deserialize)]
struct Space {
    space_id: String,
}

#[derive(Debug, Serialize)]
struct StartConversation<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StartedConversation {
    conversation_id: String,
    message_id: String,
}

#[derive(Debug, Deserialize)]
struct GenieMessage {
    status: String,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    attachment_id: String,
    text: Option<TextAttachment>,
}

#[derive(Debug, Deserialize)]
struct TextAttachment {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    statement_response: StatementResponse,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    manifest: Manifest,
    result: Option<ResultData>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    schema: Schema,
}

#[derive(Debug, Deserialize)]
struct Schema {
    #[serde(default)]
    columns: Vec<Column>,
}

#[derive(Debug, Deserialize)]
struct Column {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResultData {
    #[serde(default)]
    data_array: Vec<Vec<Value>>,
}

/// Databricks Genie client: starts a conversation in the first available
/// space, polls the message to completion, and returns the first
/// attachment as text or as the query's result table.
pub struct GenieClient {
    client: reqwest::Client,
    host: String,
    token: String,
    poll_interval: Duration,
    answer_timeout: Duration,
}

impl GenieClient {
    pub fn new(config: &EngineConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            poll_interval: config.poll_interval(),
            answer_timeout: config.timeout(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/2.0/genie/{path}", self.host)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, EngineError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, EngineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(EngineError::Backend(format!("{status}: {body}")))
    }

    async fn first_space(&self) -> Result<String, EngineError> {
        let list: SpaceList = self.get_json(&self.url("spaces")).await?;
        list.spaces
            .into_iter()
            .next()
            .map(|s| s.space_id)
            .ok_or(EngineError::Unavailable)
    }

    async fn start_conversation(
        &self,
        space_id: &str,
        content: &str,
    ) -> Result<StartedConversation, EngineError> {
        let url = self.url(&format!("spaces/{space_id}/start-conversation"));
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&StartConversation { content })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn wait_for_completion(
        &self,
        space_id: &str,
        conversation: &StartedConversation,
    ) -> Result<GenieMessage, EngineError> {
        let url = self.url(&format!(
            "spaces/{space_id}/conversations/{}/messages/{}",
            conversation.conversation_id, conversation.message_id
        ));
        let deadline = Instant::now() + self.answer_timeout;
        loop {
            let message: GenieMessage = self.get_json(&url).await?;
            debug!("Engine message status: {}", message.status);
            if message.status == "COMPLETED" {
                return Ok(message);
            }
            if is_terminal_failure(&message.status) {
                return Err(EngineError::Backend(format!(
                    "query ended in state {}",
                    message.status
                )));
            }
            if Instant::now() >= deadline {
                return Err(EngineError::Backend(
                    "timed out waiting for an answer".to_string(),
                ));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn fetch_table(
        &self,
        space_id: &str,
        conversation: &StartedConversation,
        attachment_id: &str,
    ) -> Result<AnswerPayload, EngineError> {
        let url = self.url(&format!(
            "spaces/{space_id}/conversations/{}/messages/{}/attachments/{attachment_id}/query-result",
            conversation.conversation_id, conversation.message_id
        ));
        let result: QueryResult = self.get_json(&url).await?;
        Ok(table_payload(result))
    }
}

fn is_terminal_failure(status: &str) -> bool {
    matches!(status, "FAILED" | "CANCELLED" | "QUERY_RESULT_EXPIRED")
}

fn table_payload(result: QueryResult) -> AnswerPayload {
    let columns = result
        .statement_response
        .manifest
        .schema
        .columns
        .into_iter()
        .map(|c| c.name)
        .collect();
    let rows: Vec<Vec<Value>> = result
        .statement_response
        .result
        .map(|r| r.data_array)
        .unwrap_or_default();
    AnswerPayload::Table { columns, rows }
}

#[async_trait]
impl QueryEngine for GenieClient {
    async fn ask(&self, query: &str) -> Result<AnswerPayload, EngineError> {
        let space_id = self.first_space().await?;

        // Quote the question so the engine reads it as one literal prompt.
        let content = format!("'{query}'");
        let conversation = self.start_conversation(&space_id, &content).await?;
        let message = self.wait_for_completion(&space_id, &conversation).await?;

        let Some(attachment) = message.attachments.into_iter().next() else {
            return Err(EngineError::Backend("answer had no attachments".to_string()));
        };

        match attachment.text {
            Some(text) => Ok(AnswerPayload::Text(text.content.trim().to_string())),
            None => {
                self.fetch_table(&space_id, &conversation, &attachment.attachment_id)
                    .await
            }
        }
    }
}
