use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub chat: ChatConfig,
    pub engine: EngineConfig,
    #[serde(default = "default_auth_config")]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Graph identifier of the one chat thread being bridged.
    pub chat_id: String,
    /// Sender id whose messages are never answered, so the bridge does not
    /// reply to its own replies.
    pub omit_user_id: String,
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl ChatConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Databricks workspace URL, e.g. "https://dbc-xxxx.cloud.databricks.com".
    pub host: String,
    pub token: String,
    /// How often to re-check an in-flight engine answer.
    #[serde(default = "default_engine_poll_ms")]
    pub poll_interval_ms: u64,
    /// Per-request HTTP timeout and overall answer deadline. A hung backend
    /// fails the tick instead of blocking polling forever.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_chat_base_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_engine_poll_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_listen_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_auth_config() -> AuthConfig {
    AuthConfig {
        listen_addr: default_listen_addr(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[chat]
chat_id = "19:abc@thread.v2"
omit_user_id = "bot-user"

[engine]
host = "https://dbc-1234.cloud.databricks.com"
token = "dapi-secret"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.chat.base_url, "https://graph.microsoft.com/v1.0");
        assert_eq!(config.chat.poll_interval_secs, 5);
        assert_eq!(config.engine.poll_interval_ms, 1000);
        assert_eq!(config.engine.timeout_secs, 60);
        assert_eq!(config.auth.listen_addr, "127.0.0.1:5000");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let toml = format!(
            "{MINIMAL}\n[auth]\nlisten_addr = \"0.0.0.0:8080\"\n"
        );
        let mut config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.auth.listen_addr, "0.0.0.0:8080");

        config.chat.poll_interval_secs = 2;
        assert_eq!(config.chat.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn missing_chat_section_is_an_error() {
        let result: std::result::Result<Config, _> =
            toml::from_str("[engine]\nhost = \"h\"\ntoken = \"t\"\n");
        assert!(result.is_err());
    }
}
