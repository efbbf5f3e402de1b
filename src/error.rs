use reqwest::StatusCode;

/// Failures from the chat transport.
///
/// Fetch failures leave the latest message eligible for the next tick;
/// post failures do not, since the message is consumed before the reply
/// is attempted.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Failures from the query engine backend.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no query engine space available")]
    Unavailable,

    #[error("engine request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("engine reported failure: {0}")]
    Backend(String),
}
