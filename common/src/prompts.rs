//! プロンプト生成モジュール
//!
//! 撮影地と撮影時期（季節）をヒントにした識別プロンプト

use chrono::NaiveDateTime;

/// 識別結果として要求するJSONキー
pub const RESPONSE_KEYS: &[&str] = &["common_name", "scientific_name", "order", "family"];

/// 識別プロンプト生成
///
/// # Arguments
/// * `location` - 撮影地（国単位の英語表記を推奨。例: "South Korea"）
/// * `captured` - 撮影日時。あれば月日と渡り・繁殖期のヒントを加える
pub fn build_identification_prompt(location: &str, captured: Option<&NaiveDateTime>) -> String {
    let (date_context, seasonal_hint) = match captured {
        Some(dt) => {
            let month_day = dt.format("%B %d").to_string(); // "June 16"
            (
                format!(" on {}", month_day),
                format!(
                    " Consider the seasonal migration patterns and breeding cycles typical for this time of year ({}).",
                    month_day
                ),
            )
        }
        None => (String::new(), String::new()),
    };

    let keys = RESPONSE_KEYS
        .iter()
        .map(|k| format!("'{}'", k))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "Act as an expert ornithologist specializing in the avifauna of {location}. \
         The following is a cropped image of a bird taken in {location}{date_context}.\
         {seasonal_hint} \
         Respond in JSON with {keys}. If uncertain set nulls."
    )
}
