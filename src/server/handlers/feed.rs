use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;

use super::require_session_key;
use crate::core::errors::ApiError;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddFeedRequest {
    pub rss_url: String,
}

#[derive(Debug, Deserialize)]
pub struct AddArticleRequest {
    pub title: String,
    pub url: String,
    pub text: String,
}

pub async fn add_feed(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AddFeedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_session_key(&headers)?;

    let url = Url::parse(payload.rss_url.trim())
        .map_err(|_| ApiError::InvalidInput("invalid RSS feed URL".into()))?;

    let summary = state.ingest.ingest_feed(url.as_str()).await?;
    Ok(Json(summary))
}

pub async fn add_article(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AddArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_session_key(&headers)?;

    if payload.title.trim().is_empty() || payload.url.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "article title and url are required".into(),
        ));
    }

    let chunks_indexed = state
        .ingest
        .ingest_article(payload.title.trim(), payload.url.trim(), &payload.text)
        .await?;
    Ok(Json(json!({ "chunks_indexed": chunks_indexed })))
}
