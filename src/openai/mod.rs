//! OpenAI 호환 API 클라이언트
//!
//! 임베딩과 채팅 호출이 공유하는 HTTP 계층입니다.
//! 타임아웃과 재시도는 [`HttpPolicy`]로 명시적으로 설정합니다.
//!
//! ref: https://platform.openai.com/docs/api-reference

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{HttpPolicy, OpenAiConfig};

/// OpenAI 에러 응답
#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// 공유 HTTP 클라이언트
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    policy: HttpPolicy,
}

impl OpenAiClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `base_url` - 예: `https://api.openai.com/v1`
    /// * `api_key` - Bearer 토큰
    /// * `policy` - 타임아웃 / 재시도 정책
    pub fn new(base_url: &str, api_key: &str, policy: HttpPolicy) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = policy.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            policy,
        })
    }

    /// 설정에서 생성
    pub fn from_config(config: &OpenAiConfig, policy: HttpPolicy) -> Result<Self> {
        Self::new(&config.base_url, &config.api_key, policy)
    }

    /// JSON POST (429 / 5xx / 전송 오류 시 지수 백오프 재시도)
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut last_error: Option<anyhow::Error> = None;

        for attempt in 0..=self.policy.max_retries {
            if attempt > 0 {
                let backoff = self.policy.backoff(attempt - 1);
                tracing::warn!(
                    "Retrying {} in {:?} (attempt {}/{})",
                    path,
                    backoff,
                    attempt,
                    self.policy.max_retries
                );
                tokio::time::sleep(backoff).await;
            }

            let response = match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(anyhow::Error::new(e).context(format!("Request to {} failed", url)));
                    continue;
                }
            };

            let status = response.status();
            let text = response
                .text()
                .await
                .context("Failed to read response body")?;

            if status.is_success() {
                return serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse response from {}", path));
            }

            let error = api_error(status, &text);
            if is_retryable(status) {
                last_error = Some(error);
                continue;
            }
            return Err(error);
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request to {} failed", url)))
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn api_error(status: StatusCode, body: &str) -> anyhow::Error {
    match serde_json::from_str::<OpenAiError>(body) {
        Ok(err) => anyhow::anyhow!(
            "OpenAI API error ({}, {}): {}",
            status,
            err.error.kind.unwrap_or_else(|| "unknown".to_string()),
            err.error.message
        ),
        Err(_) => anyhow::anyhow!("OpenAI API error ({}): {}", status, body),
    }
}

// ============================================================================
// Tests
// ============================================================================
