//! Document - 로더와 청커가 주고받는 텍스트 단위

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 텍스트와 메타데이터를 가진 문서
///
/// 로더가 만든 원본 문서와 청커가 만든 청크 모두 이 타입을 사용합니다.
/// 직렬화 형태는 `{"id", "metadata", "page_content", "type": "Document"}` 입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub page_content: String,
    #[serde(rename = "type", default = "document_type")]
    kind: String,
}

fn document_type() -> String {
    "Document".to_string()
}

impl Document {
    /// 메타데이터 없는 문서 생성
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            id: None,
            metadata: Map::new(),
            page_content: page_content.into(),
            kind: document_type(),
        }
    }

    /// 메타데이터 항목 추가 (builder)
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 같은 메타데이터를 가진 새 문서 (청크 생성용)
    pub fn derive(&self, page_content: impl Into<String>) -> Self {
        Self {
            id: None,
            metadata: self.metadata.clone(),
            page_content: page_content.into(),
            kind: document_type(),
        }
    }

    /// `source` 메타데이터 (없으면 None)
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialized_shape() {
        let doc = Document::new("hello").with_metadata("source", "https://example.com");
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(
            value,
            json!({
                "id": null,
                "metadata": {"source": "https://example.com"},
                "page_content": "hello",
                "type": "Document"
            })
        );
    }

    #[test]
    fn test_derive_keeps_metadata() {
        let doc = Document::new("full text").with_metadata("title", "Home");
        let chunk = doc.derive("full");

        assert_eq!(chunk.page_content, "full");
        assert_eq!(chunk.metadata, doc.metadata);
        assert_eq!(chunk.source(), None);
    }
}
