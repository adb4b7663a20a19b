//! Retriever - 임베딩 + flat 인덱스 기반 검색기
//!
//! 청크마다 벡터 하나를 만들어 인덱스를 구성하고,
//! 질의를 같은 모델로 임베딩해 가장 가까운 청크 k개를 돌려줍니다.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;

use super::document::Document;
use super::vector::{FlatIndex, SearchResult, VectorEntry};

// ============================================================================
// Retriever Trait
// ============================================================================

/// 질의 → 관련 문서 검색 트레이트
#[async_trait]
pub trait Retriever: Send + Sync {
    /// 관련도 순으로 정렬된 문서 반환
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>>;
}

// ============================================================================
// VectorRetriever
// ============================================================================

/// 벡터 검색기 (생성 후 읽기 전용)
pub struct VectorRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: FlatIndex,
    k: usize,
}

impl VectorRetriever {
    /// 청크를 임베딩해 인덱스 생성
    ///
    /// # Arguments
    /// * `chunks` - 색인할 청크 (청크 하나당 벡터 하나)
    /// * `embedder` - 청크와 질의에 함께 쓰는 임베딩 프로바이더
    /// * `k` - 검색 결과 개수
    pub async fn build(
        chunks: Vec<Document>,
        embedder: Arc<dyn EmbeddingProvider>,
        k: usize,
    ) -> Result<Self> {
        let texts: Vec<String> = chunks.iter().map(|c| c.page_content.clone()).collect();

        let embeddings = embedder
            .embed_batch(&texts)
            .await
            .context("Failed to embed chunks")?;

        anyhow::ensure!(
            embeddings.len() == chunks.len(),
            "Embedding provider returned {} vectors for {} chunks",
            embeddings.len(),
            chunks.len()
        );

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| VectorEntry { chunk, embedding })
            .collect();

        let index = FlatIndex::build(entries).context("Failed to build vector index")?;

        tracing::info!(
            "Indexed {} chunks (dimension: {}, embedder: {})",
            index.len(),
            index.dimension(),
            embedder.name()
        );

        Ok(Self { embedder, index, k })
    }

    /// 거리 포함 검색
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;
        self.index.search(&query_embedding, k)
    }

    /// 색인된 청크 수
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let results = self.search(query, self.k).await?;
        tracing::debug!("Retrieved {} chunks for query", results.len());
        Ok(results.into_iter().map(|r| r.chunk).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
