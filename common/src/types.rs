//! 識別結果の型定義
//!
//! - RawIdentification: AI（Gemini）の生の推定
//! - ReferenceMatch: Wikipedia / 種リストの照会結果
//! - ResolvedIdentification: 名前解決エンジンの最終出力
//! - Observation: 保存済み写真1枚分の観察記録

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 値が得られなかったフィールドの表示値
pub const NOT_AVAILABLE: &str = "N/A";

/// 英名も韓国名も得られなかった場合の韓国名
pub const UNIDENTIFIED: &str = "unidentified";

/// 未確認の韓国名に付く目印
pub const FALLBACK_MARKER: char = '*';

/// AIの生の識別結果（未検証）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawIdentification {
    pub common_name: Option<String>,
    pub scientific_name: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
}

impl RawIdentification {
    /// 空文字・空白のみの値を None に揃える
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
        }

        Self {
            common_name: clean(self.common_name),
            scientific_name: clean(self.scientific_name),
            order: clean(self.order),
            family: clean(self.family),
        }
    }

    /// 英名・学名のどちらかが得られていれば true
    pub fn is_identified(&self) -> bool {
        self.common_name.is_some() || self.scientific_name.is_some()
    }
}

/// 韓国名（国名）
///
/// 文字列表現では未確認名を `*` 付きで表す（`*Mallard`）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KoreanName {
    /// 参照元で確認済みの韓国名
    Resolved(String),
    /// 韓国名が見つからず英名を代用したもの
    Unresolved(String),
    /// 英名すら無い
    Unidentified,
}

impl KoreanName {
    /// `*` 付きの文字列表現から変換
    pub fn from_marked(value: &str) -> Self {
        let value = value.trim();
        if value == UNIDENTIFIED {
            KoreanName::Unidentified
        } else if let Some(rest) = value.strip_prefix(FALLBACK_MARKER) {
            KoreanName::Unresolved(rest.to_string())
        } else {
            KoreanName::Resolved(value.to_string())
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, KoreanName::Resolved(_))
    }

    /// 目印を除いた名前
    pub fn name(&self) -> &str {
        match self {
            KoreanName::Resolved(name) | KoreanName::Unresolved(name) => name,
            KoreanName::Unidentified => UNIDENTIFIED,
        }
    }
}

impl fmt::Display for KoreanName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KoreanName::Resolved(name) => write!(f, "{}", name),
            KoreanName::Unresolved(name) => write!(f, "{}{}", FALLBACK_MARKER, name),
            KoreanName::Unidentified => write!(f, "{}", UNIDENTIFIED),
        }
    }
}

impl From<String> for KoreanName {
    fn from(value: String) -> Self {
        KoreanName::from_marked(&value)
    }
}

impl From<KoreanName> for String {
    fn from(value: KoreanName) -> Self {
        value.to_string()
    }
}

/// 参照バックエンドの照会結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMatch {
    pub korean_name: KoreanName,
    /// Wikipediaのみが返す（ページタイトル）
    pub common_name: Option<String>,
}

impl ReferenceMatch {
    pub fn new(korean_name: KoreanName, common_name: Option<String>) -> Self {
        Self { korean_name, common_name }
    }
}

/// 名前解決の最終結果（写真1枚につき1つ、以後不変）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentification {
    pub korean_name: KoreanName,
    pub common_name: String,
    pub scientific_name: String,
    pub order: String,
    pub family: String,
    /// 出典ラベル（"Wikipedia", "CSV", "Wikipedia+CSV" など）
    pub source_label: String,
    /// 種リスト（CSV）が韓国名を補ったか
    pub secondary_source_used: bool,
}

impl ResolvedIdentification {
    /// "목: …, 과: …" 形式の分類表示
    pub fn taxonomy_summary(&self) -> String {
        format!("목: {}, 과: {}", self.order, self.family)
    }
}

/// 保存済み写真1枚分の観察記録
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// 撮影日時（EXIF）
    pub capture_datetime: Option<NaiveDateTime>,
    /// 元のファイル名
    #[serde(default)]
    pub source_filename: String,
    /// 保存先でのファイル名
    pub stored_filename: String,
    #[serde(flatten)]
    pub identification: ResolvedIdentification,
    pub taxonomy_summary: String,
}

impl Observation {
    pub fn new(
        identification: ResolvedIdentification,
        capture_datetime: Option<NaiveDateTime>,
        source_filename: impl Into<String>,
        stored_filename: impl Into<String>,
    ) -> Self {
        let taxonomy_summary = identification.taxonomy_summary();
        Self {
            capture_datetime,
            source_filename: source_filename.into(),
            stored_filename: stored_filename.into(),
            identification,
            taxonomy_summary,
        }
    }

    pub fn korean_name(&self) -> &KoreanName {
        &self.identification.korean_name
    }

    pub fn common_name(&self) -> &str {
        &self.identification.common_name
    }

    pub fn scientific_name(&self) -> &str {
        &self.identification.scientific_name
    }

    pub fn order(&self) -> &str {
        &self.identification.order
    }

    pub fn family(&self) -> &str {
        &self.identification.family
    }
}
