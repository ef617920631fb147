//! 保存ファイル名の生成

use crate::types::{KoreanName, NOT_AVAILABLE};
use chrono::NaiveDateTime;
use regex::Regex;

lazy_static::lazy_static! {
    // `*` は未確認マーカーも兼ねる
    static ref ILLEGAL_CHARS: Regex = Regex::new(r#"[\\/:"*?<>|]"#).unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// ファイル名に使えない文字を除去し、空白の連続を `_` 1つにまとめる
pub fn sanitize_filename(name: &str) -> String {
    let stripped = ILLEGAL_CHARS.replace_all(name, "");
    WHITESPACE.replace_all(stripped.trim(), "_").into_owned()
}

/// 撮影日時プレフィックス（`20240601_090000_`）。日時不明なら空文字
pub fn date_prefix(captured: Option<&NaiveDateTime>) -> String {
    captured
        .map(|dt| dt.format("%Y%m%d_%H%M%S_").to_string())
        .unwrap_or_default()
}

/// 拡張子・連番を除いた保存名を組み立てる
///
/// - 韓国名確認済み: `{日時}{韓国名}_{英名}`
/// - 未確認: `{日時}{英名}`
/// - 識別不能: `{日時}unidentified_{学名}`
pub fn build_base_name(
    korean_name: &KoreanName,
    common_name: &str,
    scientific_name: &str,
    captured: Option<&NaiveDateTime>,
) -> String {
    let prefix = date_prefix(captured);
    let body = match korean_name {
        KoreanName::Resolved(korean) => format!(
            "{}_{}",
            sanitize_filename(korean),
            sanitize_filename(common_name)
        ),
        KoreanName::Unresolved(_) => sanitize_filename(common_name),
        KoreanName::Unidentified if scientific_name != NOT_AVAILABLE => format!(
            "{}_{}",
            korean_name.name(),
            sanitize_filename(scientific_name)
        ),
        KoreanName::Unidentified => korean_name.name().to_string(),
    };

    format!("{}{}", prefix, body)
}
