use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::chain::ChainOutput;
use crate::server::error::ApiError;
use crate::server::AppState;

/// `POST /chat/invoke` 요청 본문
#[derive(Debug, Deserialize)]
pub struct ChatInput {
    pub input: String,
}

/// 질문 하나를 체인에 전달하고 체인 출력을 그대로 반환
pub async fn chat_invoke(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatInput>, JsonRejection>,
) -> Result<Json<ChainOutput>, ApiError> {
    let Json(chat_input) = payload?;
    tracing::debug!("Question: {}", chat_input.input);

    let output = state
        .chain
        .invoke(&chat_input.input)
        .await
        .map_err(|e| ApiError::internal(format!("{:#}", e)))?;

    Ok(Json(output))
}
