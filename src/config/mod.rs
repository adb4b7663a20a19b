//! 설정 모듈 - 환경변수 기반 애플리케이션 설정
//!
//! 프로세스 시작 시 한 번 읽습니다. `.env` 파일이 있으면 먼저 로드합니다.
//! 파싱은 키 조회 함수에 대한 순수 함수로 구현되어 있어
//! 테스트에서 프로세스 환경을 건드리지 않습니다.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::knowledge::ChunkConfig;

// ============================================================================
// Defaults
// ============================================================================

/// 기본 수집 대상 URL
pub const DEFAULT_TARGET_URL: &str = "https://www.promtior.com";

/// OpenAI 호환 API 기본 엔드포인트
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// 검색 결과 기본 개수 (top-k)
pub const DEFAULT_RETRIEVER_K: usize = 4;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 2;

/// USER_AGENT 미설정 시 사용할 값
pub fn default_user_agent() -> String {
    format!("promtior-rag/{}", env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set. Add it to the environment or to a .env file")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Types
// ============================================================================

/// 외부 호출 타임아웃 / 재시도 정책
#[derive(Debug, Clone, PartialEq)]
pub struct HttpPolicy {
    /// 요청당 타임아웃 (None이면 무제한)
    pub timeout: Option<Duration>,
    /// 429 / 5xx / 전송 오류 시 최대 재시도 횟수
    pub max_retries: u32,
    /// 첫 재시도 전 대기 시간 (이후 2배씩 증가)
    pub initial_backoff: Duration,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl HttpPolicy {
    /// `attempt`번째 (0-based) 재시도 전 대기 시간
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// OpenAI 호환 API 설정
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f32,
}

/// 애플리케이션 전체 설정
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai: OpenAiConfig,
    /// 수집할 웹 페이지
    pub target_url: Url,
    /// 웹 요청에 사용할 User-Agent
    pub user_agent: String,
    pub chunk: ChunkConfig,
    pub retriever_k: usize,
    pub http: HttpPolicy,
}

impl AppConfig {
    /// 프로세스 환경변수에서 로드 (`.env` 포함)
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Failed to read .env file: {}", e),
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로부터 설정 구성
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let base_url = get("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        Url::parse(&base_url).map_err(|e| ConfigError::Invalid {
            key: "OPENAI_BASE_URL",
            reason: e.to_string(),
        })?;

        let target = get("PROMTIOR_URL").unwrap_or_else(|| DEFAULT_TARGET_URL.to_string());
        let target_url = Url::parse(&target).map_err(|e| ConfigError::Invalid {
            key: "PROMTIOR_URL",
            reason: e.to_string(),
        })?;
        if !matches!(target_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: "PROMTIOR_URL",
                reason: format!("unsupported scheme '{}'", target_url.scheme()),
            });
        }

        let user_agent = match get("USER_AGENT") {
            Some(ua) => ua,
            None => {
                let ua = default_user_agent();
                tracing::warn!("USER_AGENT is not set, using '{}'", ua);
                ua
            }
        };

        let chunk = ChunkConfig {
            chunk_size: parse_or(&get, "CHUNK_SIZE", ChunkConfig::default().chunk_size)?,
            chunk_overlap: parse_or(&get, "CHUNK_OVERLAP", ChunkConfig::default().chunk_overlap)?,
        };
        chunk.validate().map_err(|e| ConfigError::Invalid {
            key: "CHUNK_OVERLAP",
            reason: e.to_string(),
        })?;

        let retriever_k = parse_or(&get, "RETRIEVER_K", DEFAULT_RETRIEVER_K)?;
        if retriever_k == 0 {
            return Err(ConfigError::Invalid {
                key: "RETRIEVER_K",
                reason: "must be at least 1".to_string(),
            });
        }

        let temperature = parse_or(&get, "CHAT_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                key: "CHAT_TEMPERATURE",
                reason: format!("{} is outside 0.0..=2.0", temperature),
            });
        }

        let timeout_secs = parse_or(&get, "REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let http = HttpPolicy {
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_retries: parse_or(&get, "MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            ..Default::default()
        };

        Ok(Self {
            openai: OpenAiConfig {
                api_key,
                base_url,
                chat_model: get("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
                embedding_model: get("EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                temperature,
            },
            target_url,
            user_agent,
            chunk,
            retriever_k,
            http,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: format!("'{}': {}", raw, e),
        }),
        None => Ok(default),
    }
}

// ============================================================================
// Tests
// ============================================================================
