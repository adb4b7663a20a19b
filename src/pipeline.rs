//! 파이프라인 조립 - 시작 시 한 번 실행
//!
//! 로드 → 분할 → 임베딩/색인 → 체인 구성.
//! 어느 단계든 실패하면 [`InitializationError`]로 감싸 돌려주며,
//! 서버는 요청을 받기 전에 종료합니다.

use std::sync::Arc;

use thiserror::Error;

use crate::chain::{PromptTemplate, RetrievalChain, StuffDocumentsChain};
use crate::config::AppConfig;
use crate::embedding::{EmbeddingProvider, OpenAiEmbedding};
use crate::knowledge::{
    load_all, recursive_chunker, Chunker, DocumentLoader, TextLoader, VectorRetriever, WebLoader,
};
use crate::llm::{ChatModel, OpenAiChat};
use crate::scraper::WebScraper;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to create clients: {0:#}")]
    Clients(#[source] anyhow::Error),

    #[error("Failed to load documents: {0:#}")]
    Load(#[source] anyhow::Error),

    #[error("Failed to split documents: {0:#}")]
    Split(#[source] anyhow::Error),

    #[error("Failed to build vector index: {0:#}")]
    Index(#[source] anyhow::Error),
}

/// 파이프라인 구성 요소
///
/// 외부 서비스는 트레이트 객체로 받아 테스트에서 교체할 수 있습니다.
pub struct PipelineParts {
    pub loaders: Vec<Box<dyn DocumentLoader>>,
    pub chunker: Box<dyn Chunker>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn ChatModel>,
    pub prompt: PromptTemplate,
    pub retriever_k: usize,
}

impl PipelineParts {
    /// 설정으로 실제 클라이언트 구성
    pub fn from_config(config: &AppConfig) -> Result<Self, InitializationError> {
        // 웹 요청은 재시도하지 않음
        let scraper = WebScraper::new(&config.user_agent, config.http.timeout)
            .map_err(InitializationError::Clients)?;

        let embedder = OpenAiEmbedding::from_config(&config.openai, config.http.clone())
            .map_err(InitializationError::Clients)?;
        let llm = OpenAiChat::from_config(&config.openai, config.http.clone())
            .map_err(InitializationError::Clients)?;

        let chunker = recursive_chunker(config.chunk).map_err(InitializationError::Split)?;

        Ok(Self {
            loaders: vec![
                Box::new(WebLoader::new(scraper, config.target_url.as_str())),
                Box::new(TextLoader::manual_context()),
            ],
            chunker,
            embedder: Arc::new(embedder),
            llm: Arc::new(llm),
            prompt: PromptTemplate::default(),
            retriever_k: config.retriever_k,
        })
    }
}

/// 로드 → 분할 → 색인
pub async fn build_retriever(
    loaders: &[Box<dyn DocumentLoader>],
    chunker: &dyn Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    k: usize,
) -> Result<VectorRetriever, InitializationError> {
    let documents = load_all(loaders)
        .await
        .map_err(InitializationError::Load)?;

    let chunks = chunker.split_documents(&documents);
    tracing::info!(
        "Split {} documents into {} chunks ({})",
        documents.len(),
        chunks.len(),
        chunker.name()
    );

    VectorRetriever::build(chunks, embedder, k)
        .await
        .map_err(InitializationError::Index)
}

/// 구성 요소로 체인 조립
pub async fn build_chain(parts: PipelineParts) -> Result<RetrievalChain, InitializationError> {
    let retriever = build_retriever(
        &parts.loaders,
        parts.chunker.as_ref(),
        parts.embedder,
        parts.retriever_k,
    )
    .await?;

    Ok(RetrievalChain::new(
        Arc::new(retriever),
        StuffDocumentsChain::new(parts.llm, parts.prompt),
    ))
}

/// 설정으로 체인 조립 (프로세스당 한 번)
pub async fn initialize(config: &AppConfig) -> Result<RetrievalChain, InitializationError> {
    tracing::info!("Building knowledge base from {}", config.target_url);
    let parts = PipelineParts::from_config(config)?;
    build_chain(parts).await
}

// ============================================================================
// Tests
// ============================================================================
