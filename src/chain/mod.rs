//! Chain 모듈 - 검색 후 생성 (retrieve-then-generate)
//!
//! - [`PromptTemplate`]: `{context}`, `{input}` 자리표시자 치환
//! - [`StuffDocumentsChain`]: 검색된 문서를 프롬프트 하나에 모두 넣어 LLM 호출
//! - [`RetrievalChain`]: Retriever + StuffDocumentsChain, 요청마다 `invoke`

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::knowledge::{Document, Retriever};
use crate::llm::{ChatMessage, ChatModel};

/// 기본 프롬프트
pub const DEFAULT_PROMPT: &str = "You are a helpful assistant for Promtior company.
Answer the question based on the following context:

{context}

Question: {input}";

/// 문서 사이 구분자
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

// ============================================================================
// PromptTemplate
// ============================================================================

/// `{context}` / `{input}` 치환 템플릿
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// 템플릿 생성 (두 자리표시자가 모두 있어야 함)
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in ["{context}", "{input}"] {
            anyhow::ensure!(
                template.contains(placeholder),
                "Prompt template is missing {}",
                placeholder
            );
        }
        Ok(Self { template })
    }

    /// 치환 (한 번의 패스로 처리해 값 안의 중괄호는 그대로 유지)
    pub fn render(&self, context: &str, input: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + input.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix("{context}") {
                out.push_str(context);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{input}") {
                out.push_str(input);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_PROMPT.to_string(),
        }
    }
}

// ============================================================================
// StuffDocumentsChain
// ============================================================================

/// 문서들을 하나의 컨텍스트로 합쳐 답변 생성
pub struct StuffDocumentsChain {
    llm: Arc<dyn ChatModel>,
    prompt: PromptTemplate,
}

impl StuffDocumentsChain {
    pub fn new(llm: Arc<dyn ChatModel>, prompt: PromptTemplate) -> Self {
        Self { llm, prompt }
    }

    /// 문서 본문을 구분자로 연결
    pub fn format_context(documents: &[Document]) -> String {
        documents
            .iter()
            .map(|d| d.page_content.as_str())
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR)
    }

    /// LLM에 보낼 메시지 구성 (user 메시지 하나)
    pub fn messages(&self, input: &str, documents: &[Document]) -> Vec<ChatMessage> {
        let context = Self::format_context(documents);
        vec![ChatMessage::user(self.prompt.render(&context, input))]
    }

    /// 답변 생성 (LLM 출력 그대로)
    pub async fn answer(&self, input: &str, documents: &[Document]) -> Result<String> {
        let messages = self.messages(input, documents);
        self.llm
            .complete(&messages)
            .await
            .with_context(|| format!("LLM call to {} failed", self.llm.name()))
    }
}

// ============================================================================
// RetrievalChain
// ============================================================================

/// 체인 출력 (HTTP 응답 본문)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainOutput {
    pub input: String,
    pub context: Vec<Document>,
    pub answer: String,
}

/// 검색 → 답변 체인 (생성 후 불변, 요청 간 공유)
pub struct RetrievalChain {
    retriever: Arc<dyn Retriever>,
    combine: StuffDocumentsChain,
}

impl RetrievalChain {
    pub fn new(retriever: Arc<dyn Retriever>, combine: StuffDocumentsChain) -> Self {
        Self { retriever, combine }
    }

    /// 질문 하나 처리
    pub async fn invoke(&self, input: &str) -> Result<ChainOutput> {
        let context = self
            .retriever
            .retrieve(input)
            .await
            .context("Retrieval failed")?;

        let answer = self.combine.answer(input, &context).await?;

        Ok(ChainOutput {
            input: input.to_string(),
            context,
            answer,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
