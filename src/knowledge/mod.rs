//! Knowledge 모듈 - 메모리 내 RAG 지식 베이스
//!
//! - Document: 로더와 청커가 주고받는 텍스트 단위
//! - Loader: 웹 페이지 + 수동 컨텍스트 로드
//! - Chunker: 재귀 문자 분할 (1000 / 200)
//! - Vector: flat L2 인덱스
//! - Retriever: 임베딩 + 인덱스 top-k 검색

mod chunker;
mod document;
mod loader;
pub(crate) mod retriever;
mod vector;

// Re-exports
pub use chunker::{Chunker, ChunkConfig, RecursiveCharacterSplitter, recursive_chunker};
pub use document::Document;
pub use loader::{DocumentLoader, TextLoader, WebLoader, load_all, MANUAL_CONTEXT};
pub use retriever::{Retriever, VectorRetriever};
pub use vector::{FlatIndex, SearchResult, VectorEntry, squared_l2};
