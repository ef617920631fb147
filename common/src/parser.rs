//! AIレスポンスパーサー
//!
//! Geminiのレスポンス本文からJSONを抽出し、RawIdentificationに変換する

use crate::error::{Error, Result};
use crate::types::RawIdentification;
use serde_json::Value;

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト / [...] 配列（先に現れる方）
/// 3. エラー
///
/// # Examples
/// ```
/// use bird_ai_common::extract_json;
///
/// let response = "Result: {\"common_name\": \"Mallard\"}";
/// let json = extract_json(response).unwrap();
/// assert!(json.starts_with('{'));
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    let object = bracket_span(response, '{', '}');
    let array = bracket_span(response, '[', ']');
    let span = match (object, array) {
        (Some(o), Some(a)) => Some(if a.0 < o.0 { a } else { o }),
        (o, a) => o.or(a),
    };

    span.map(|(start, end)| &response[start..=end])
        .ok_or_else(|| Error::Parse("JSONが見つかりません".into()))
}

fn bracket_span(response: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = response.find(open)?;
    let end = response.rfind(close)?;
    (end > start).then_some((start, end))
}

/// 識別レスポンスをパース
///
/// 複数画像を送るため、モデルが配列で返すことがある。その場合は
/// 名前を含む最初の要素を採用する。
pub fn parse_identification(response: &str) -> Result<RawIdentification> {
    let json_str = extract_json(response)?;
    let value: Value = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("識別結果 JSONパースエラー: {}", e)))?;

    let object = match value {
        Value::Object(_) => value,
        Value::Array(items) => {
            let mut candidates: Vec<RawIdentification> = Vec::new();
            for item in items.into_iter().filter(Value::is_object) {
                candidates.push(to_identification(item)?);
            }
            return Ok(candidates
                .into_iter()
                .find(RawIdentification::is_identified)
                .unwrap_or_default());
        }
        other => {
            return Err(Error::Parse(format!(
                "識別結果がオブジェクトではありません: {}",
                other
            )))
        }
    };

    to_identification(object)
}

fn to_identification(value: Value) -> Result<RawIdentification> {
    let raw: RawIdentification = serde_json::from_value(value)
        .map_err(|e| Error::Parse(format!("識別結果の型が不正: {}", e)))?;
    Ok(raw.normalized())
}
