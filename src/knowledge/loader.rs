//! Document Loaders - 수집 소스에서 Document 생성

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::scraper::WebScraper;

use super::document::Document;

/// 웹 페이지 외에 항상 함께 색인되는 수동 컨텍스트
pub const MANUAL_CONTEXT: &str = "\nPromtior was founded in 2023\n";

/// 페이지에 description / lang이 없을 때 메타데이터 값
pub const NO_DESCRIPTION: &str = "No description found.";
pub const NO_LANGUAGE: &str = "No language found.";

// ============================================================================
// DocumentLoader Trait
// ============================================================================

/// 문서 로더 트레이트
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// 문서 로드
    async fn load(&self) -> Result<Vec<Document>>;

    /// 로그용 이름
    fn describe(&self) -> String;
}

// ============================================================================
// WebLoader
// ============================================================================

/// 웹 페이지 하나를 문서 하나로 로드
pub struct WebLoader {
    scraper: WebScraper,
    url: String,
}

impl WebLoader {
    pub fn new(scraper: WebScraper, url: impl Into<String>) -> Self {
        Self {
            scraper,
            url: url.into(),
        }
    }
}

#[async_trait]
impl DocumentLoader for WebLoader {
    async fn load(&self) -> Result<Vec<Document>> {
        let scraped = self.scraper.scrape(&self.url).await?;

        let mut doc = Document::new(scraped.content).with_metadata("source", scraped.url);
        if let Some(title) = scraped.title {
            doc = doc.with_metadata("title", title);
        }
        doc = doc
            .with_metadata(
                "description",
                scraped.description.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            )
            .with_metadata(
                "language",
                scraped.language.unwrap_or_else(|| NO_LANGUAGE.to_string()),
            );

        Ok(vec![doc])
    }

    fn describe(&self) -> String {
        format!("web page {}", self.url)
    }
}

// ============================================================================
// TextLoader
// ============================================================================

/// 고정 텍스트를 문서 하나로 로드 (메타데이터 없음)
pub struct TextLoader {
    text: String,
}

impl TextLoader {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// [`MANUAL_CONTEXT`] 로더
    pub fn manual_context() -> Self {
        Self::new(MANUAL_CONTEXT)
    }
}

#[async_trait]
impl DocumentLoader for TextLoader {
    async fn load(&self) -> Result<Vec<Document>> {
        Ok(vec![Document::new(self.text.clone())])
    }

    fn describe(&self) -> String {
        "manual context".to_string()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 로더를 순서대로 실행해 문서를 합침 (하나라도 실패하면 전체 실패)
pub async fn load_all(loaders: &[Box<dyn DocumentLoader>]) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    for loader in loaders {
        let docs = loader
            .load()
            .await
            .with_context(|| format!("Failed to load {}", loader.describe()))?;
        tracing::info!("Loaded {} document(s) from {}", docs.len(), loader.describe());
        documents.extend(docs);
    }

    Ok(documents)
}

// ============================================================================
// Tests
// ============================================================================
