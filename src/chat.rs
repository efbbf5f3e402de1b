use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ChatConfig;
use crate::error::ChatError;

/// A single message fetched from the chat thread.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    /// Absent for system/app messages with no user author.
    pub sender_id: Option<String>,
    pub body_html: String,
}

/// Fetch/post operations against the chat service.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// The single most recent message in the thread, if any.
    async fn fetch_latest(&self, token: &str) -> Result<Option<ChatMessage>, ChatError>;

    /// Append an HTML-content message to the thread.
    async fn post_html(&self, token: &str, html: &str) -> Result<(), ChatError>;
}

// Graph wire shapes. Only the fields the bridge reads are modeled.

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    value: Vec<GraphMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphMessage {
    id: String,
    from: Option<MessageFrom>,
    body: MessageBody,
}

#[derive(Debug, Deserialize)]
struct MessageFrom {
    user: Option<MessageUser>,
}

#[derive(Debug, Deserialize)]
struct MessageUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    body: PostBody<'a>,
}

#[derive(Debug, Serialize)]
struct PostBody<'a> {
    #[serde(rename = "contentType")]
    content_type: &'a str,
    content: &'a str,
}

/// Microsoft Graph chat client bound to one chat thread.
pub struct GraphChatClient {
    client: reqwest::Client,
    base_url: String,
    chat_id: String,
}

impl GraphChatClient {
    pub fn new(config: &ChatConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_id: config.chat_id.clone(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/chats/{}/messages", self.base_url, self.chat_id)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ChatError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ChatError::Status { status, body })
    }
}

#[async_trait]
impl ChatTransport for GraphChatClient {
    async fn fetch_latest(&self, token: &str) -> Result<Option<ChatMessage>, ChatError> {
        let url = self.messages_url();
        debug!("Fetching latest message from {url}");

        let response = self
            .client
            .get(&url)
            .query(&[("$top", "1"), ("$orderby", "createdDateTime desc")])
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await?;

        let list: MessageList = Self::check(response).await?.json().await?;
        Ok(list.value.into_iter().next().map(|m| ChatMessage {
            id: m.id,
            sender_id: m.from.and_then(|f| f.user).map(|u| u.id),
            body_html: m.body.content,
        }))
    }

    async fn post_html(&self, token: &str, html: &str) -> Result<(), ChatError> {
        let response = self
            .client
            .post(self.messages_url())
            .header("Authorization", format!("Bearer {token}"))
            .json(&PostMessage {
                body: PostBody {
                    content_type: "html",
                    content: html,
                },
            })
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_graph_message_list() {
        let json = r#"{
            "value": [{
                "id": "1737000000000",
                "from": { "user": { "id": "user-42", "displayName": "Ada" } },
                "body": { "contentType": "html", "content": "<p>hello</p>" }
            }]
        }"#;
        let list: MessageList = serde_json::from_str(json).unwrap();
        assert_eq!(list.value.len(), 1);
        let m = &list.value[0];
        assert_eq!(m.id, "1737000000000");
        assert_eq!(m.from.as_ref().unwrap().user.as_ref().unwrap().id, "user-42");
        assert_eq!(m.body.content, "<p>hello</p>");
    }

    #[test]
    fn deserializes_message_without_user_sender() {
        let json = r#"{"value": [{"id": "7", "from": null, "body": {}}]}"#;
        let list: MessageList = serde_json::from_str(json).unwrap();
        assert!(list.value[0].from.is_none());
        assert_eq!(list.value[0].body.content, "");
    }

    #[test]
    fn empty_value_list_deserializes() {
        let list: MessageList = serde_json::from_str(r#"{"value": []}"#).unwrap();
        assert!(list.value.is_empty());
    }

    #[test]
    fn post_body_uses_html_content_type() {
        let json = serde_json::to_value(PostMessage {
            body: PostBody {
                content_type: "html",
                content: "hi<br>there",
            },
        })
        .unwrap();
        assert_eq!(json["body"]["contentType"], "html");
        assert_eq!(json["body"]["content"], "hi<br>there");
    }
}
