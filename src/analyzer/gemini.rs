//! Gemini API連携（generateContent）

use super::image_prep::encode_jpeg_base64;
use super::{IdentifyError, SpeciesIdentifier};
use crate::error::{BirdAiError, Result};
use async_trait::async_trait;
use bird_ai_common::{parse_identification, RawIdentification};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini APIリクエスト
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini APIレスポンス
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BirdAiError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    /// 接続先を差し替える（プロキシ・検証用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Gemini API呼び出し（本文テキストを返す）
    async fn call_gemini_api(&self, request: &GeminiRequest) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| BirdAiError::ApiCall(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BirdAiError::ApiCall(format!("status {}: {}", status, text)));
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| BirdAiError::ApiParse(e.to_string()))?;

        Ok(response_text(payload))
    }
}

fn build_request(prompt: &str, images: &[DynamicImage]) -> Result<GeminiRequest> {
    let mut parts: Vec<Part> = vec![Part::Text {
        text: prompt.to_string(),
    }];

    for image in images {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: "image/jpeg".to_string(),
                data: encode_jpeg_base64(image)?,
            },
        });
    }

    Ok(GeminiRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            temperature: 0.1,
            response_mime_type: "application/json".to_string(),
        },
    })
}

/// 最初の候補のテキストを連結（候補が無ければ空）
fn response_text(payload: GeminiResponse) -> String {
    payload
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

fn interpret_text(text: &str) -> std::result::Result<RawIdentification, IdentifyError> {
    if text.trim().is_empty() {
        return Err(IdentifyError::Malformed("빈 응답".into()));
    }
    parse_identification(text)
        .map(RawIdentification::normalized)
        .map_err(|e| IdentifyError::Malformed(e.to_string()))
}

#[async_trait]
impl SpeciesIdentifier for GeminiClient {
    async fn identify(
        &self,
        prompt: &str,
        images: &[DynamicImage],
    ) -> std::result::Result<RawIdentification, IdentifyError> {
        let request = build_request(prompt, images)?;
        let text = self.call_gemini_api(&request).await?;
        tracing::debug!(model = %self.model, response = %text, "gemini response");
        interpret_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_request_serialization() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])));
        let request = build_request("identify", &[image]).unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "identify");
        assert_eq!(
            json["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/jpeg"
        );
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let payload: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"common_name\":"},{"text":"\"Mallard\"}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(payload), r#"{"common_name":"Mallard"}"#);
    }

    #[test]
    fn test_response_without_candidates() {
        let payload: GeminiResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert_eq!(response_text(payload), "");
        assert!(matches!(interpret_text(""), Err(IdentifyError::Malformed(_))));
    }

    #[test]
    fn test_interpret_text() {
        let raw = interpret_text(r#"{"common_name": " Mallard ", "scientific_name": "Anas platyrhynchos", "order": "null"}"#)
            .unwrap();
        assert_eq!(raw.common_name.as_deref(), Some("Mallard"));
        assert!(raw.order.is_none());

        assert!(matches!(
            interpret_text("Sorry, I cannot identify this bird."),
            Err(IdentifyError::Malformed(_))
        ));
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new("key", "gemini-2.0-flash", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:9000/v1beta/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
