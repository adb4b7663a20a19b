//! Vector Index - 메모리 내 정확 최근접 이웃 검색
//!
//! 모든 벡터와 질의 벡터의 제곱 유클리드 거리를 계산하는 flat 인덱스입니다.
//! 한 번 생성되면 읽기 전용이며 프로세스 재시작 시 사라집니다.

use anyhow::{bail, Result};

use super::document::Document;

// ============================================================================
// Types
// ============================================================================

/// 벡터 엔트리 (저장용)
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// 원본 청크
    pub chunk: Document,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 검색 결과
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// 인덱스 내 위치 (삽입 순서)
    pub position: usize,
    pub chunk: Document,
    /// 제곱 유클리드 거리 (작을수록 유사)
    pub distance: f32,
}

// ============================================================================
// FlatIndex
// ============================================================================

/// 읽기 전용 flat 벡터 인덱스
#[derive(Debug, Default)]
pub struct FlatIndex {
    dimension: usize,
    entries: Vec<VectorEntry>,
}

impl FlatIndex {
    /// 엔트리로 인덱스 생성
    ///
    /// 모든 벡터의 차원이 같아야 합니다.
    pub fn build(entries: Vec<VectorEntry>) -> Result<Self> {
        let dimension = entries.first().map(|e| e.embedding.len()).unwrap_or(0);

        if !entries.is_empty() && dimension == 0 {
            bail!("Embedding vectors must not be empty");
        }
        if let Some((i, entry)) = entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.embedding.len() != dimension)
        {
            bail!(
                "Dimension mismatch at entry {}: expected {}, got {}",
                i,
                dimension,
                entry.embedding.len()
            );
        }

        Ok(Self { dimension, entries })
    }

    /// 최근접 `k`개 검색 (거리 오름차순, 동률은 삽입 순서)
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(vec![]);
        }
        if query.len() != self.dimension {
            bail!(
                "Query dimension mismatch: expected {}, got {}",
                self.dimension,
                query.len()
            );
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, squared_l2(query, &e.embedding)))
            .collect();

        // stable sort: 동률이면 삽입 순서 유지
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(position, distance)| SearchResult {
                position,
                chunk: self.entries[position].chunk.clone(),
                distance,
            })
            .collect())
    }

    /// 벡터 개수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 벡터 차원 (비어 있으면 0)
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 제곱 유클리드 거리
///
/// 길이가 다르면 짧은 쪽 길이까지만 계산합니다. 호출 측에서 차원을 검증합니다.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

// ============================================================================
// Tests
// ============================================================================
