//! 임베딩 모듈 - OpenAI Embeddings API를 통한 텍스트 벡터화
//!
//! 청크와 질의를 같은 모델로 벡터화합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = OpenAiEmbedding::from_config(&config.openai, config.http.clone())?;
//! let embedding = embedder.embed("Hello, world!").await?;
//! ```

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{HttpPolicy, OpenAiConfig};
use crate::openai::OpenAiClient;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .context("Embedding provider returned no vector")
    }

    /// 배치 임베딩 (입력 순서대로 반환)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Embedding
// ============================================================================

/// 요청당 최대 입력 개수
pub const MAX_BATCH_SIZE: usize = 1000;

/// OpenAI 임베딩 구현체
///
/// source: https://platform.openai.com/docs/api-reference/embeddings
#[derive(Debug, Clone)]
pub struct OpenAiEmbedding {
    client: OpenAiClient,
    model: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedding {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// 설정에서 생성
    pub fn from_config(config: &OpenAiConfig, policy: HttpPolicy) -> Result<Self> {
        let client = OpenAiClient::from_config(config, policy)?;
        Ok(Self::new(client, config.embedding_model.clone()))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(MAX_BATCH_SIZE).enumerate() {
            tracing::debug!(
                "Embedding batch {} ({} inputs, model={})",
                i + 1,
                batch.len(),
                self.model
            );

            let request = EmbedRequest {
                model: &self.model,
                input: batch,
            };
            let response: EmbedResponse = self
                .client
                .post_json("embeddings", &request)
                .await
                .context("Embedding request failed")?;

            results.extend(order_by_index(response.data, batch.len())?);
        }

        Ok(results)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// 응답 벡터를 `index` 기준으로 정렬하고 개수 검증
fn order_by_index(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        bail!(
            "Embedding count mismatch: sent {} inputs, received {} vectors",
            expected,
            data.len()
        );
    }

    data.sort_by_key(|d| d.index);
    if data.iter().enumerate().any(|(i, d)| d.index != i) {
        bail!("Embedding response has missing or duplicate indices");
    }

    Ok(data.into_iter().map(|d| d.embedding).collect())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::tests::{fast_policy, spawn};

    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    #[test]
    fn test_order_by_index() {
        let data = vec![
            EmbeddingData { index: 1, embedding: vec![1.0] },
            EmbeddingData { index: 0, embedding: vec![0.0] },
        ];
        let ordered = order_by_index(data, 2).unwrap();
        assert_eq!(ordered, vec![vec![0.0], vec![1.0]]);
    }

    #[test]
    fn test_order_by_index_rejects_bad_responses() {
        let data = vec![EmbeddingData { index: 0, embedding: vec![0.0] }];
        assert!(order_by_index(data, 2).is_err());

        let data = vec![
            EmbeddingData { index: 0, embedding: vec![0.0] },
            EmbeddingData { index: 0, embedding: vec![1.0] },
        ];
        assert!(order_by_index(data, 2).is_err());
    }

    /// 입력 길이를 벡터로 돌려주는 가짜 embeddings 엔드포인트 (역순 응답)
    fn fake_openai() -> Router {
        Router::new().route(
            "/v1/embeddings",
            post(|Json(body): Json<Value>| async move {
                let inputs = body["input"].as_array().cloned().unwrap_or_default();
                let mut data: Vec<Value> = inputs
                    .iter()
                    .enumerate()
                    .map(|(i, text)| {
                        let len = text.as_str().map(|s| s.len()).unwrap_or(0) as f32;
                        json!({"object": "embedding", "index": i, "embedding": [len, 1.0]})
                    })
                    .collect();
                data.reverse();
                Json(json!({"object": "list", "data": data, "model": body["model"]}))
            }),
        )
    }

    #[tokio::test]
    async fn test_embed_batch_against_local_server() {
        let addr = spawn(fake_openai()).await;
        let client = OpenAiClient::new(&format!("http://{}/v1", addr), "sk-test", fast_policy(0)).unwrap();
        let embedder = OpenAiEmbedding::new(client, "text-embedding-ada-002");

        let texts = vec!["a".to_string(), "abc".to_string(), "ab".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(vectors, vec![vec![1.0, 1.0], vec![3.0, 1.0], vec![2.0, 1.0]]);

        let single = embedder.embed("hello").await.unwrap();
        assert_eq!(single, vec![5.0, 1.0]);
    }

    #[tokio::test]
    async fn test_embed_batch_empty_input() {
        let addr = spawn(fake_openai()).await;
        let client = OpenAiClient::new(&format!("http://{}/v1", addr), "sk-test", fast_policy(0)).unwrap();
        let embedder = OpenAiEmbedding::new(client, "text-embedding-ada-002");

        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}
