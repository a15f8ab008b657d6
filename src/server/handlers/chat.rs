use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::stream;
use serde::Deserialize;
use serde_json::json;

use super::require_session_key;
use crate::chat::AnswerEvent;
use crate::core::errors::ApiError;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Stream an answer as server-sent events: one `delta` per resolved text
/// increment, then a `done` sentinel (or a terminal `error`).
pub async fn ask(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_key = require_session_key(&headers)?;
    let events = state.chat.ask(&session_key, &payload.question).await?;

    let stream = stream::unfold(events, |mut events| async move {
        events
            .recv()
            .await
            .map(|event| (Ok::<_, Infallible>(to_sse_event(event)), events))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse_event(event: AnswerEvent) -> Event {
    match event {
        AnswerEvent::Delta(text) => Event::default().event("delta").data(text),
        AnswerEvent::Done => Event::default().event("done").data("[DONE]"),
        AnswerEvent::Error(err) => Event::default().event("error").data(
            json!({ "kind": err.kind(), "error": err.to_string() }).to_string(),
        ),
    }
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let session_key = require_session_key(&headers)?;
    let history = state.sessions.load(&session_key).await?;
    Ok(Json(json!({ "history": history })))
}

pub async fn clear_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let session_key = require_session_key(&headers)?;
    state.sessions.clear(&session_key).await?;
    Ok(Json(json!({ "success": true })))
}
