//! Wikipedia（MediaWiki API）による照会
//!
//! ページの韓国語版へのリンクを韓国名とする。リンクが無ければ
//! ページタイトルを未確認名（`*Title`）として返す。

use crate::error::{BirdAiError, Result};
use async_trait::async_trait;
use bird_ai_common::{EncyclopediaLookup, KoreanName, LookupError, ReferenceMatch};
use serde::Deserialize;
use std::time::Duration;

const KOREAN_LANG: &str = "ko";
const USER_AGENT: &str = concat!("bird-ai/", env!("CARGO_PKG_VERSION"), " (wild bird photo organizer)");

#[derive(Deserialize)]
struct QueryResponse {
    query: Option<Query>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Deserialize)]
struct Query {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    langlinks: Vec<LangLink>,
}

#[derive(Deserialize)]
struct LangLink {
    lang: String,
    title: String,
}

pub struct WikipediaClient {
    client: reqwest::Client,
    api_url: String,
}

impl WikipediaClient {
    /// `language` は照会するWikipediaの言語版（通常 "en"）
    pub fn new(language: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BirdAiError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            api_url: format!("https://{}.wikipedia.org/w/api.php", language),
        })
    }

    async fn fetch(&self, title: &str) -> std::result::Result<String, LookupError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("prop", "langlinks"),
                ("lllang", KOREAN_LANG),
                ("redirects", "1"),
                ("titles", title),
            ])
            .send()
            .await
            .map_err(|e| LookupError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Http(format!("status {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| LookupError::Http(e.to_string()))
    }
}

#[async_trait]
impl EncyclopediaLookup for WikipediaClient {
    fn name(&self) -> &str {
        "Wikipedia"
    }

    async fn page(&self, title: &str) -> std::result::Result<Option<ReferenceMatch>, LookupError> {
        if title.trim().is_empty() {
            return Ok(None);
        }
        let body = self.fetch(title.trim()).await?;
        let found = parse_query_response(&body)?;
        tracing::debug!(title, found = found.is_some(), "wikipedia lookup");
        Ok(found)
    }
}

/// クエリ結果を解釈する。ページが無ければ `Ok(None)`
pub(crate) fn parse_query_response(body: &str) -> std::result::Result<Option<ReferenceMatch>, LookupError> {
    let response: QueryResponse =
        serde_json::from_str(body).map_err(|e| LookupError::Malformed(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(LookupError::Unavailable(format!("{}: {}", error.code, error.info)));
    }

    let page = match response.query.and_then(|q| q.pages.into_iter().next()) {
        Some(page) if !page.missing && !page.invalid => page,
        _ => return Ok(None),
    };

    let korean = page
        .langlinks
        .iter()
        .find(|link| link.lang == KOREAN_LANG && !link.title.trim().is_empty())
        .map(|link| KoreanName::Resolved(link.title.trim().to_string()))
        .unwrap_or_else(|| KoreanName::Unresolved(page.title.clone()));

    Ok(Some(ReferenceMatch::new(korean, Some(page.title))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_with_korean_link() {
        let body = r#"{"batchcomplete":true,"query":{"redirects":[{"from":"Anas platyrhynchos","to":"Mallard"}],
            "pages":[{"pageid":19346,"ns":0,"title":"Mallard","langlinks":[{"lang":"ko","title":"청둥오리"}]}]}}"#;
        let found = parse_query_response(body).unwrap().unwrap();
        assert_eq!(found.korean_name, KoreanName::Resolved("청둥오리".into()));
        assert_eq!(found.common_name.as_deref(), Some("Mallard"));
    }

    #[test]
    fn test_parse_page_without_korean_link() {
        let body = r#"{"query":{"pages":[{"pageid":1,"ns":0,"title":"Eastern Spot-billed Duck"}]}}"#;
        let found = parse_query_response(body).unwrap().unwrap();
        assert_eq!(
            found.korean_name,
            KoreanName::Unresolved("Eastern Spot-billed Duck".into())
        );
        assert!(!found.korean_name.is_resolved());
    }

    #[test]
    fn test_parse_missing_page() {
        let body = r#"{"query":{"pages":[{"ns":0,"title":"Nonexistent bird","missing":true}]}}"#;
        assert_eq!(parse_query_response(body).unwrap(), None);
    }

    #[test]
    fn test_parse_invalid_title() {
        let body = r#"{"query":{"pages":[{"title":"<>","invalidreason":"bad","invalid":true}]}}"#;
        assert_eq!(parse_query_response(body).unwrap(), None);
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"error":{"code":"ratelimited","info":"slow down"}}"#;
        assert!(matches!(
            parse_query_response(body),
            Err(LookupError::Unavailable(_))
        ));
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(
            parse_query_response("<html>"),
            Err(LookupError::Malformed(_))
        ));
    }
}
