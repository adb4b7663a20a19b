//! Text Chunking Module
//!
//! 재귀 문자 분할 (recursive character splitting).
//! 문단 → 줄 → 단어 → 문자 순서로 경계를 찾아 고정 크기 청크로 나누고,
//! 인접 청크 사이에 설정된 길이만큼 오버랩을 둡니다.
//!
//! 길이는 바이트가 아니라 문자(Unicode scalar) 단위입니다.

use std::collections::VecDeque;

use anyhow::{bail, Result};

use super::document::Document;

/// 분할 경계 우선순위 (빈 문자열 = 문자 단위 강제 분할)
const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// 최대 청크 크기 (문자 수)
    pub chunk_size: usize,
    /// 인접 청크 오버랩 (문자 수)
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkConfig {
    /// 설정 유효성 검사
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk_size must be greater than 0");
        }
        if self.chunk_overlap >= self.chunk_size {
            bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap,
                self.chunk_size
            );
        }
        Ok(())
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;

    /// 문서 목록 분할 (메타데이터는 각 청크로 복사)
    fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        documents
            .iter()
            .flat_map(|doc| {
                self.chunk(&doc.page_content)
                    .into_iter()
                    .map(move |text| doc.derive(text))
            })
            .collect()
    }
}

// ============================================================================
// RecursiveCharacterSplitter
// ============================================================================

/// 재귀 문자 분할기
///
/// 1. 텍스트에 존재하는 첫 번째 구분자로 자릅니다 (구분자는 다음 조각 앞에 유지).
/// 2. `chunk_size`보다 짧은 조각은 탐욕적으로 병합합니다.
/// 3. 여전히 긴 조각은 남은 구분자로 다시 분할합니다.
pub struct RecursiveCharacterSplitter {
    config: ChunkConfig,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    /// 설정으로 생성 (잘못된 설정은 거부)
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// 기본 설정 (1000 / 200)
    pub fn with_defaults() -> Self {
        Self {
            config: ChunkConfig::default(),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // 텍스트에 존재하는 첫 구분자 선택
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits = split_keeping_separator(text, separator);

        let mut chunks = Vec::new();
        let mut good: Vec<String> = Vec::new();

        for piece in splits {
            if char_len(&piece) < self.config.chunk_size {
                good.push(piece);
                continue;
            }

            if !good.is_empty() {
                chunks.extend(self.merge_splits(&good, ""));
                good.clear();
            }

            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !good.is_empty() {
            chunks.extend(self.merge_splits(&good, ""));
        }

        chunks
    }

    /// 작은 조각 병합 + 오버랩 유지
    fn merge_splits(&self, splits: &[String], separator: &str) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let sep_len = char_len(separator);
        let joiner = |current: &VecDeque<(&str, usize)>| if current.is_empty() { 0 } else { sep_len };

        let mut docs = Vec::new();
        let mut current: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in splits {
            let len = char_len(piece);

            if total + len + joiner(&current) > size {
                if total > size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        size
                    );
                }

                if !current.is_empty() {
                    if let Some(doc) = join_pieces(&current, separator) {
                        docs.push(doc);
                    }

                    // 오버랩 이하가 될 때까지 앞쪽 조각 제거
                    while total > overlap || (total + len + joiner(&current) > size && total > 0) {
                        let has_more = current.len() > 1;
                        let Some((_, first_len)) = current.pop_front() else {
                            break;
                        };
                        total -= first_len + if has_more { sep_len } else { 0 };
                    }
                }
            }

            current.push_back((piece.as_str(), len));
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }

        if let Some(doc) = join_pieces(&current, separator) {
            docs.push(doc);
        }

        docs
    }
}

impl Chunker for RecursiveCharacterSplitter {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![];
        }
        self.split_recursive(text, &self.separators)
    }

    fn name(&self) -> &'static str {
        "RecursiveCharacterSplitter"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 구분자로 분할하되 구분자를 다음 조각 앞에 붙여 유지
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut parts = text.split(separator);
    let mut splits = Vec::new();
    if let Some(first) = parts.next() {
        splits.push(first.to_string());
    }
    for part in parts {
        splits.push(format!("{}{}", separator, part));
    }

    splits.retain(|s| !s.is_empty());
    splits
}

fn join_pieces(pieces: &VecDeque<(&str, usize)>, separator: &str) -> Option<String> {
    let joined = pieces
        .iter()
        .map(|(piece, _)| *piece)
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 설정을 지정한 청커 생성
pub fn recursive_chunker(config: ChunkConfig) -> Result<Box<dyn Chunker>> {
    Ok(Box::new(RecursiveCharacterSplitter::new(config)?))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> RecursiveCharacterSplitter {
        RecursiveCharacterSplitter::new(ChunkConfig {
            chunk_size,
            chunk_overlap,
        })
        .unwrap()
    }

    /// 앞 청크의 접미사이면서 뒤 청크의 접두사인 가장 긴 문자열 길이
    fn shared_len(prev: &str, next: &str) -> usize {
        let next_chars: Vec<char> = next.chars().collect();
        (1..=next_chars.len())
            .rev()
            .find(|&n| {
                let prefix: String = next_chars[..n].iter().collect();
                prev.ends_with(&prefix)
            })
            .unwrap_or(0)
    }

    fn sample_text() -> String {
        let sentence = "Promtior helps companies adopt generative AI with custom solutions. ";
        let paragraph = sentence.repeat(12);
        format!("{}\n\n{}\n{}", paragraph.trim(), paragraph.trim(), paragraph.trim())
    }

    #[test]
    fn test_chunker_empty() {
        let chunker = RecursiveCharacterSplitter::with_defaults();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\n ").is_empty());
    }

    #[test]
    fn test_chunker_small_text() {
        let chunker = RecursiveCharacterSplitter::with_defaults();
        let chunks = chunker.chunk("\nPromtior was founded in 2023\n");
        assert_eq!(chunks, vec!["Promtior was founded in 2023".to_string()]);
    }

    #[test]
    fn test_paragraphs_merge_when_they_fit() {
        let chunker = RecursiveCharacterSplitter::with_defaults();
        let chunks = chunker.chunk("First paragraph.\n\nSecond paragraph.");
        assert_eq!(chunks, vec!["First paragraph.\n\nSecond paragraph.".to_string()]);
    }

    #[test]
    fn test_word_split_with_overlap() {
        let chunks = splitter(7, 3).chunk("a b c d e f g h i j");
        assert_eq!(chunks, vec!["a b c d", "d e f", "f g h", "h i j"]);
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let chunks = splitter(4, 1).chunk("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_chunks_never_exceed_size() {
        let text = sample_text();
        let chunker = splitter(200, 40);
        let chunks = chunker.chunk(&text);

        assert!(chunks.len() > 3);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 200, "chunk too long: {}", char_len(chunk));
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = (0..400)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunker = splitter(100, 20);
        let chunks = chunker.chunk(&text);

        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let shared = shared_len(&pair[0], &pair[1]);
            assert!(shared > 0, "no overlap between {:?} and {:?}", pair[0], pair[1]);
            assert!(shared <= 20);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = sample_text();
        let chunker = splitter(300, 60);
        assert_eq!(chunker.chunk(&text), chunker.chunk(&text));
    }

    #[test]
    fn test_multibyte_lengths_are_characters() {
        // 3바이트 문자 10개 = 10 문자
        let text = "가".repeat(10);
        let chunks = splitter(5, 0).chunk(&text);
        assert_eq!(chunks, vec!["가가가가가", "가가가가가"]);
    }

    #[test]
    fn test_split_documents_copies_metadata() {
        let docs = vec![
            Document::new("a b c d e f g h i j").with_metadata("source", "web"),
            Document::new("tiny"),
        ];
        let chunks = splitter(7, 3).split_documents(&docs);

        assert_eq!(chunks.len(), 4 + 1);
        assert!(chunks[..4].iter().all(|c| c.source() == Some("web")));
        assert!(chunks[4..].iter().all(|c| c.metadata.is_empty()));
    }

    #[test]
    fn test_invalid_config() {
        assert!(RecursiveCharacterSplitter::new(ChunkConfig {
            chunk_size: 0,
            chunk_overlap: 0
        })
        .is_err());
        assert!(RecursiveCharacterSplitter::new(ChunkConfig {
            chunk_size: 100,
            chunk_overlap: 150
        })
        .is_err());
    }

    #[test]
    fn test_split_keeping_separator() {
        assert_eq!(
            split_keeping_separator("a\n\nb\n\nc", "\n\n"),
            vec!["a", "\n\nb", "\n\nc"]
        );
        assert_eq!(split_keeping_separator("\n\nb", "\n\n"), vec!["\n\nb"]);
        assert_eq!(split_keeping_separator("ab", ""), vec!["a", "b"]);
    }
}
