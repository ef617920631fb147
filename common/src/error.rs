//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// 参照バックエンド（Wikipedia / 種リスト）の照会エラー
///
/// 名前解決エンジンの外には伝播せず、「一致なし」として扱われる
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
