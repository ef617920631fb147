//! 種リスト（学名→韓国名）モジュール
//!
//! 読み込み時に列構成を一度だけ判定し、
//! 「学名（小文字・trim済み）→韓国名」の表に正規化する。
//!
//! 対応する列構成:
//! - ヘッダーあり: `scientific_name` / `korean_name`（または `학명` / `국명`）
//! - ヘッダーなし: 1列目=韓国名、2列目=学名（0始まり）

use crate::error::LookupError;
use crate::resolver::ChecklistLookup;
use crate::types::{KoreanName, ReferenceMatch};
use std::collections::HashMap;

const SCIENTIFIC_HEADERS: &[&str] = &["scientific_name", "학명"];
const KOREAN_HEADERS: &[&str] = &["korean_name", "국명"];

/// ヘッダーなしの場合の列位置
const POSITIONAL_KOREAN: usize = 1;
const POSITIONAL_SCIENTIFIC: usize = 2;

/// 読み込み時に判定した列構成
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    /// ヘッダー行から列位置を決定
    Named { scientific: usize, korean: usize },
    /// ヘッダーなし（固定位置）
    Positional,
}

impl ColumnLayout {
    fn columns(&self) -> (usize, usize) {
        match *self {
            ColumnLayout::Named { scientific, korean } => (scientific, korean),
            ColumnLayout::Positional => (POSITIONAL_SCIENTIFIC, POSITIONAL_KOREAN),
        }
    }
}

/// 正規化済みの種リスト
#[derive(Debug, Clone)]
pub struct SpeciesTable {
    layout: ColumnLayout,
    entries: HashMap<String, String>,
}

impl SpeciesTable {
    /// 行データから構築
    ///
    /// 先頭行がヘッダーとして認識できれば列名方式、できなければ
    /// 先頭行もデータとして位置方式で読む。同じ学名は先勝ち。
    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut rows = rows.into_iter().peekable();

        let layout = rows
            .peek()
            .and_then(|first| detect_header(first.as_ref()))
            .unwrap_or(ColumnLayout::Positional);

        if matches!(layout, ColumnLayout::Named { .. }) {
            rows.next();
        }

        let (sci_col, ko_col) = layout.columns();
        let mut entries = HashMap::new();

        for row in rows {
            let fields = row.as_ref();
            let (Some(sci), Some(korean)) = (fields.get(sci_col), fields.get(ko_col)) else {
                continue;
            };

            let key = normalize_key(sci.as_ref());
            let korean = korean.as_ref().trim();
            if key.is_empty() || korean.is_empty() {
                continue;
            }

            entries.entry(key).or_insert_with(|| korean.to_string());
        }

        Self { layout, entries }
    }

    /// CSV文字列から読み込み
    pub fn from_csv_str(content: &str) -> Self {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let rows: Vec<Vec<&str>> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_csv_line)
            .collect();
        Self::from_rows(rows)
    }

    /// 学名で韓国名を検索（大文字小文字・前後空白を無視した完全一致）
    pub fn lookup(&self, scientific_name: &str) -> Option<&str> {
        self.entries
            .get(&normalize_key(scientific_name))
            .map(String::as_str)
    }

    pub fn layout(&self) -> ColumnLayout {
        self.layout
    }

    /// 登録件数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ChecklistLookup for SpeciesTable {
    fn korean_name(&self, scientific_name: &str) -> Result<Option<ReferenceMatch>, LookupError> {
        Ok(self
            .lookup(scientific_name)
            .map(|korean| ReferenceMatch::new(KoreanName::from_marked(korean), None)))
    }
}

fn detect_header<S: AsRef<str>>(fields: &[S]) -> Option<ColumnLayout> {
    let position = |names: &[&str]| {
        fields
            .iter()
            .position(|f| names.contains(&f.as_ref().trim().to_lowercase().as_str()))
    };

    Some(ColumnLayout::Named {
        scientific: position(SCIENTIFIC_HEADERS)?,
        korean: position(KOREAN_HEADERS)?,
    })
}

fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// CSV行をパース（ダブルクォート対応）
fn parse_csv_line(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut in_quotes = false;
    let mut field_start = 0;

    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(trim_quotes(&line[field_start..i]));
                field_start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    // 最後のフィールド
    fields.push(trim_quotes(&line[field_start..]));
    fields
}

fn trim_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.starts_with('"') && s.ends_with('"') && s.len() >= 2 {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMED_CSV: &str = "번호,국명,학명,영명
1,청둥오리,Anas platyrhynchos,Mallard
2,흰뺨검둥오리,Anas zonorhyncha,Eastern Spot-billed Duck
";

    const HEADERLESS_CSV: &str = "1,청둥오리,Anas platyrhynchos,Mallard
2,흰뺨검둥오리,Anas zonorhyncha,Eastern Spot-billed Duck
3,\"박새, 일반\",Parus minor,Japanese Tit
";

    #[test]
    fn test_named_layout_korean_headers() {
        let table = SpeciesTable::from_csv_str(NAMED_CSV);
        assert_eq!(table.layout(), ColumnLayout::Named { scientific: 2, korean: 1 });
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("Anas platyrhynchos"), Some("청둥오리"));
    }

    #[test]
    fn test_named_layout_english_headers_any_order() {
        let csv = "korean_name,note,scientific_name\n박새,,Parus minor\n";
        let table = SpeciesTable::from_csv_str(csv);
        assert_eq!(table.layout(), ColumnLayout::Named { scientific: 2, korean: 0 });
        assert_eq!(table.lookup("parus minor"), Some("박새"));
    }

    #[test]
    fn test_positional_layout_includes_first_row() {
        let table = SpeciesTable::from_csv_str(HEADERLESS_CSV);
        assert_eq!(table.layout(), ColumnLayout::Positional);
        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup("Anas platyrhynchos"), Some("청둥오리"));
        assert_eq!(table.lookup("Parus minor"), Some("박새, 일반"));
    }

    #[test]
    fn test_both_layouts_same_semantics() {
        let named = SpeciesTable::from_csv_str(NAMED_CSV);
        let positional = SpeciesTable::from_csv_str(HEADERLESS_CSV);
        for sci in ["Anas platyrhynchos", "ANAS ZONORHYNCHA", "  anas zonorhyncha  "] {
            assert_eq!(
                named.korean_name(sci).unwrap(),
                positional.korean_name(sci).unwrap()
            );
        }
    }

    #[test]
    fn test_lookup_case_insensitive_trimmed() {
        let table = SpeciesTable::from_csv_str(NAMED_CSV);
        assert_eq!(table.lookup("  ANAS Platyrhynchos "), Some("청둥오리"));
        assert_eq!(table.lookup("Anas"), None);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let csv = "1,첫번째,Anas acuta\n2,두번째,Anas acuta\n";
        let table = SpeciesTable::from_csv_str(csv);
        assert_eq!(table.lookup("Anas acuta"), Some("첫번째"));
    }

    #[test]
    fn test_short_rows_skipped() {
        let csv = "1,청둥오리\n2,박새,Parus minor\n";
        let table = SpeciesTable::from_csv_str(csv);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_bom_stripped() {
        let csv = "\u{feff}scientific_name,korean_name\nPica serica,까치\n";
        let table = SpeciesTable::from_csv_str(csv);
        assert!(matches!(table.layout(), ColumnLayout::Named { .. }));
        assert_eq!(table.lookup("Pica serica"), Some("까치"));
    }

    #[test]
    fn test_from_rows_owned_strings() {
        let rows = vec![
            vec!["scientific_name".to_string(), "korean_name".to_string()],
            vec!["Pica serica".to_string(), "까치".to_string()],
        ];
        let table = SpeciesTable::from_rows(rows);
        assert_eq!(table.lookup("pica serica"), Some("까치"));
    }

    #[test]
    fn test_checklist_lookup_miss() {
        let table = SpeciesTable::from_csv_str(NAMED_CSV);
        assert_eq!(table.korean_name("Corvus corax").unwrap(), None);
    }
}
