//! promtior-rag - Promtior 웹사이트 기반 RAG 챗봇 서버
//!
//! 시작 시 웹 페이지와 수동 컨텍스트를 임베딩해 메모리 인덱스를 만들고,
//! `POST /chat/invoke`로 들어온 질문에 검색된 청크를 근거로 답합니다.

pub mod chain;
pub mod config;
pub mod embedding;
pub mod knowledge;
pub mod llm;
pub mod openai;
pub mod pipeline;
pub mod scraper;
pub mod server;

// Re-exports
pub use chain::{ChainOutput, PromptTemplate, RetrievalChain, StuffDocumentsChain};
pub use config::{AppConfig, ConfigError, HttpPolicy, OpenAiConfig};
pub use embedding::{EmbeddingProvider, OpenAiEmbedding};
pub use knowledge::{
    ChunkConfig, Chunker, Document, DocumentLoader, FlatIndex, RecursiveCharacterSplitter,
    Retriever, SearchResult, TextLoader, VectorEntry, VectorRetriever, WebLoader,
};
pub use llm::{ChatMessage, ChatModel, OpenAiChat, Role};
pub use openai::OpenAiClient;
pub use pipeline::{initialize, InitializationError, PipelineParts};
pub use crate::scraper::{ScrapedContent, WebScraper};
pub use server::{AppState, ApiError};
