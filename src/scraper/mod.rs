//! 웹 스크래퍼 모듈 - URL 콘텐츠 추출
//!
//! 페이지 하나를 가져와 보이는 텍스트와 기본 메타데이터
//! (title, description, language)를 추출합니다.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static WHITESPACE: OnceLock<Regex> = OnceLock::new();

fn whitespace() -> &'static Regex {
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex"))
}

/// 텍스트 추출에서 제외할 태그
const SKIPPED_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// 스크랩된 콘텐츠
#[derive(Debug, Clone)]
pub struct ScrapedContent {
    /// 페이지 제목
    pub title: Option<String>,
    /// `<meta name="description">`
    pub description: Option<String>,
    /// `<html lang>`
    pub language: Option<String>,
    /// 본문 텍스트 (텍스트 노드당 한 줄)
    pub content: String,
    /// 원본 URL
    pub url: String,
}

/// 웹 스크래퍼
pub struct WebScraper {
    client: reqwest::Client,
}

impl WebScraper {
    /// 새 스크래퍼 생성
    ///
    /// # Arguments
    /// * `user_agent` - 모든 요청에 붙일 User-Agent
    /// * `timeout` - 요청 타임아웃 (None이면 무제한)
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// URL에서 콘텐츠 추출
    pub async fn scrape(&self, url: &str) -> Result<ScrapedContent> {
        tracing::info!("Scraping: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("HTTP request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Fetching {} returned {}", url, status);
        }

        let html = response.text().await.context("Failed to read response body")?;
        let mut scraped = parse_html(&html);
        scraped.url = url.to_string();

        tracing::debug!("Scraped {} characters from {}", scraped.content.len(), url);
        Ok(scraped)
    }
}

/// HTML 문서 파싱 (url은 비워둠)
pub fn parse_html(html: &str) -> ScrapedContent {
    let document = Html::parse_document(html);

    ScrapedContent {
        title: extract_title(&document),
        description: extract_meta_description(&document),
        language: extract_language(&document),
        content: extract_content(&document),
        url: String::new(),
    }
}

/// 제목 추출 (`<title>`)
fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    (!title.is_empty()).then_some(title)
}

fn extract_meta_description(document: &Html) -> Option<String> {
    let selector = Selector::parse(r#"meta[name="description"]"#).ok()?;
    let content = document
        .select(&selector)
        .next()?
        .value()
        .attr("content")?
        .trim()
        .to_string();
    (!content.is_empty()).then_some(content)
}

fn extract_language(document: &Html) -> Option<String> {
    let selector = Selector::parse("html").ok()?;
    document
        .select(&selector)
        .next()?
        .value()
        .attr("lang")
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

/// 본문 추출 (body 우선, 없으면 문서 전체)
fn extract_content(document: &Html) -> String {
    if let Ok(selector) = Selector::parse("body") {
        if let Some(body) = document.select(&selector).next() {
            return extract_text_from_element(&body);
        }
    }
    extract_text_from_element(&document.root_element())
}

/// 요소에서 텍스트 추출 (스크립트/스타일 제외)
///
/// 텍스트 노드마다 한 줄로, 줄 안의 연속 공백은 하나로 합칩니다.
fn extract_text_from_element(element: &ElementRef) -> String {
    let spaces = whitespace();
    let mut lines = Vec::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| SKIPPED_TAGS.contains(&el.name()))
                .unwrap_or(false)
        });
        if skipped {
            continue;
        }

        let line = spaces.replace_all(text, " ").trim().to_string();
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}
