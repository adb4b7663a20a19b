//! HTTP 서버 모듈
//!
//! `POST /chat/invoke` 하나만 노출합니다. 체인은 시작 시 만들어진
//! [`AppState`]에 들어 있고 요청 간에 읽기 전용으로 공유됩니다.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::chain::RetrievalChain;

pub use error::ApiError;
pub use handlers::ChatInput;

/// 공유 서버 상태 (시작 후 불변)
pub struct AppState {
    pub chain: RetrievalChain,
}

impl AppState {
    pub fn new(chain: RetrievalChain) -> Arc<Self> {
        Arc::new(Self { chain })
    }
}

/// 라우터 생성
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat/invoke", post(handlers::chat_invoke))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 리스너에서 요청 처리 (Ctrl+C 시 정상 종료)
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use anyhow::bail;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    use crate::chain::tests::{sample_chain, ExtractiveChat};
    use crate::llm::{ChatMessage, ChatModel};

    struct FailingChat;

    #[async_trait]
    impl ChatModel for FailingChat {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            bail!("upstream timeout")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    async fn start(chain: RetrievalChain) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(AppState::new(chain));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn start_default() -> SocketAddr {
        start(sample_chain(Arc::new(ExtractiveChat::default())).await).await
    }

    fn invoke_url(addr: SocketAddr) -> String {
        format!("http://{}/chat/invoke", addr)
    }

    #[tokio::test]
    async fn test_invoke_returns_chain_output() {
        let addr = start_default().await;

        let response = reqwest::Client::new()
            .post(invoke_url(addr))
            .json(&json!({"input": "When was Promtior founded?"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["input"], "When was Promtior founded?");
        assert!(body["answer"].as_str().unwrap().contains("2023"));

        let context = body["context"].as_array().unwrap();
        assert_eq!(context.len(), 4);
        assert_eq!(context[0]["page_content"], "Promtior was founded in 2023");
        assert_eq!(context[0]["type"], "Document");
    }

    #[tokio::test]
    async fn test_extra_fields_are_ignored() {
        let addr = start_default().await;

        let response = reqwest::Client::new()
            .post(invoke_url(addr))
            .json(&json!({"input": "When was Promtior founded?", "config": {}}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_input_is_client_error() {
        let addr = start_default().await;

        let response = reqwest::Client::new()
            .post(invoke_url(addr))
            .json(&json!({"question": "When?"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("input"));
    }

    #[tokio::test]
    async fn test_wrong_input_type_is_client_error() {
        let addr = start_default().await;

        let response = reqwest::Client::new()
            .post(invoke_url(addr))
            .json(&json!({"input": 42}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_malformed_json_is_client_error() {
        let addr = start_default().await;

        let response = reqwest::Client::new()
            .post(invoke_url(addr))
            .header("content-type", "application/json")
            .body("{\"input\": ")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].is_string());

        // content-type 없는 본문도 같은 상태 코드
        let response = reqwest::Client::new()
            .post(invoke_url(addr))
            .body("input=hello")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_only_post_chat_invoke_is_routed() {
        let addr = start_default().await;
        let client = reqwest::Client::new();

        let response = client.get(invoke_url(addr)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chain_failure_is_server_error() {
        let addr = start(sample_chain(Arc::new(FailingChat)).await).await;

        let response = reqwest::Client::new()
            .post(invoke_url(addr))
            .json(&json!({"input": "When was Promtior founded?"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detail"], error::INTERNAL_ERROR_DETAIL);
        assert!(!body.to_string().contains("upstream timeout"));
    }
}
