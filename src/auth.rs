//! Token ingestion endpoint.
//!
//! The OAuth handshake itself happens out of band; whatever runs it POSTs
//! the resulting bearer token to `/token`, which drops it into the shared
//! [`CredentialStore`] for the dispatch loop to pick up on its next tick.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::credential::CredentialStore;

#[derive(Clone)]
struct AppState {
    credentials: Arc<CredentialStore>,
}

#[derive(Deserialize)]
struct TokenRequest {
    access_token: String,
}

#[derive(Serialize)]
struct TokenResponse {
    ok: bool,
}

async fn receive_token(
    State(state): State<AppState>,
    Json(body): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, StatusCode> {
    if body.access_token.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    state.credentials.set(body.access_token);
    info!("Bearer token received; polling is unblocked");
    Ok(Json(TokenResponse { ok: true }))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

fn router(credentials: Arc<CredentialStore>) -> Router {
    Router::new()
        .route("/token", post(receive_token))
        .route("/healthz", get(healthz))
        .with_state(AppState { credentials })
}

pub async fn serve(listen_addr: &str, credentials: Arc<CredentialStore>) -> Result<()> {
    let app = router(credentials);
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {listen_addr}"))?;

    info!("Token endpoint listening on http://{listen_addr}/token");
    axum::serve(listener, app)
        .await
        .context("Token server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn posted_token_lands_in_the_store() {
        let store = Arc::new(CredentialStore::new());
        let state = AppState {
            credentials: store.clone(),
        };

        let result = receive_token(
            State(state),
            Json(TokenRequest {
                access_token: "ey-abc".to_string(),
            }),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(store.get(), Some("ey-abc".to_string()));
    }

    #[tokio::test]
    async fn blank_token_is_rejected() {
        let store = Arc::new(CredentialStore::new());
        let state = AppState {
            credentials: store.clone(),
        };

        let result = receive_token(
            State(state),
            Json(TokenRequest {
                access_token: "   ".to_string(),
            }),
        )
        .await;

        assert_eq!(result.err(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(store.get(), None);
    }
}
