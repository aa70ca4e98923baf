//! HTTP front for the vault QA pipeline: `POST /chat` answers a query for a
//! session key, `POST /sources` returns the citations behind the last
//! info-seeking reply.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task;
use tracing::{error, info};

use dory_index::IndexHandle;
use dory_llm::GeneratorClient;
use dory_qa::{answer_query, sources_for, SessionStore, Settings};

struct AppState {
    index: IndexHandle,
    store: SessionStore,
    generator: GeneratorClient,
    settings: Settings,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();
    let settings = Settings::load()?;

    // backend misconfiguration (e.g. a missing API key) fails here, before
    // any request is accepted
    let generator = GeneratorClient::new(settings.generator_config())?;
    let index = IndexHandle::eager(settings.vault_path.clone());
    let store = SessionStore::open(&settings.session_path, settings.session_max_turns);
    let state = Arc::new(AppState {
        index,
        store,
        generator,
        settings,
    });

    let app = Router::new()
        .route("/chat", post(handle_chat))
        .route("/sources", post(handle_sources))
        .with_state(state);
    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening" = %addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    user_id: String,
    channel_id: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
}

#[derive(Debug, Deserialize)]
struct SourcesRequest {
    user_id: String,
    channel_id: String,
}

#[derive(Debug, Serialize)]
struct SourcesResponse {
    sources: Vec<String>,
}

async fn handle_chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let state = state.clone();
    let reply = task::spawn_blocking(move || {
        answer_query(
            &state.index,
            &state.store,
            &state.generator,
            &state.settings,
            &body.user_id,
            &body.channel_id,
            &body.text,
        )
    })
    .await
    .map_err(AppError::internal)??;
    Ok(Json(ChatResponse { reply }))
}

async fn handle_sources(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SourcesRequest>,
) -> Result<Json<SourcesResponse>, AppError> {
    let sources = sources_for(&state.store, &body.user_id, &body.channel_id);
    Ok(Json(SourcesResponse { sources }))
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn internal<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::Internal(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Internal(err) => {
                error!("internal_error" = %err);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}
