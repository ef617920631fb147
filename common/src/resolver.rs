//! 名前解決エンジン
//!
//! AIの推定（英名・学名）を2つの参照元で検証し、最終的な韓国名と出典を決める。
//!
//! ## 優先順位
//! 1. Wikipedia（英名 → 学名の順で照会）。英名はWikipediaのタイトルを採用
//! 2. 韓国名が得られなければ種リスト（学名で照会）
//! 3. どちらも失敗したら AI の英名を `*` 付きで代用
//!
//! 参照元のエラーはここで「一致なし」に畳み込み、呼び出し側には伝播しない。

use crate::error::LookupError;
use crate::sink::LogSink;
use crate::types::{KoreanName, RawIdentification, ReferenceMatch, ResolvedIdentification, NOT_AVAILABLE};
use async_trait::async_trait;

/// 出典ラベル
pub mod source_label {
    pub const WIKIPEDIA: &str = "Wikipedia";
    pub const CSV: &str = "CSV";
    pub const WIKIPEDIA_CSV: &str = "Wikipedia+CSV";
    pub const CSV_WIKIPEDIA_SUPPLEMENT: &str = "CSV (Wikipedia supplement)";
    pub const AI_UNVERIFIED: &str = "AI (unverified)";
    pub const KOREAN_UNCONFIRMED_SUFFIX: &str = " (Korean name unconfirmed)";
}

/// 百科事典型の参照元（Wikipedia）
#[async_trait]
pub trait EncyclopediaLookup: Send + Sync {
    /// ログ用の名前
    fn name(&self) -> &str;

    /// タイトルでページを照会。ページが無ければ `Ok(None)`
    async fn page(&self, title: &str) -> Result<Option<ReferenceMatch>, LookupError>;
}

/// 学名→韓国名の参照元（種リスト）
pub trait ChecklistLookup: Send + Sync {
    fn korean_name(&self, scientific_name: &str) -> Result<Option<ReferenceMatch>, LookupError>;
}

/// 名前解決エンジン
///
/// 参照元は読み取り専用で、実行中の全写真で共有される。
pub struct NameResolver<'a> {
    encyclopedia: Option<&'a dyn EncyclopediaLookup>,
    checklist: Option<&'a dyn ChecklistLookup>,
    sink: &'a dyn LogSink,
}

impl<'a> NameResolver<'a> {
    pub fn new(
        encyclopedia: Option<&'a dyn EncyclopediaLookup>,
        checklist: Option<&'a dyn ChecklistLookup>,
        sink: &'a dyn LogSink,
    ) -> Self {
        Self {
            encyclopedia,
            checklist,
            sink,
        }
    }

    /// 1枚分の推定を解決する
    ///
    /// 英名・学名がともに無い推定は呼び出し側でスキップすること。
    pub async fn resolve(&self, raw: &RawIdentification) -> ResolvedIdentification {
        let mut common = or_not_available(&raw.common_name);
        let scientific = or_not_available(&raw.scientific_name);
        let order = or_not_available(&raw.order);
        let family = or_not_available(&raw.family);

        let mut korean: Option<KoreanName> = None;
        let mut source: Option<String> = None;
        let mut csv_used = false;
        // 同じ学名での再照会を避ける
        let mut checklist_answer: Option<Option<ReferenceMatch>> = None;

        let wiki = self.lookup_encyclopedia(raw).await;

        if let Some(found) = &wiki {
            if let Some(title) = &found.common_name {
                common = title.clone();
            }
            korean = Some(found.korean_name.clone());
            source = Some(source_label::WIKIPEDIA.to_string());

            if !found.korean_name.is_resolved() {
                self.sink.line("  - Wikipedia 한국명 없음, CSV 보완 시도...");
                let answer = self.lookup_checklist(raw.scientific_name.as_deref());
                if let Some(hit) = &answer {
                    korean = Some(hit.korean_name.clone());
                    source = Some(source_label::WIKIPEDIA_CSV.to_string());
                    csv_used = true;
                }
                checklist_answer = Some(answer);
            }
        }

        if wiki.is_none() || !is_resolved(&korean) {
            self.sink.line("  - CSV에서 직접 조회...");
            let answer = match checklist_answer {
                Some(answer) => answer,
                None => self.lookup_checklist(raw.scientific_name.as_deref()),
            };
            if let Some(hit) = answer {
                korean = Some(hit.korean_name);
                source = Some(if wiki.is_none() {
                    source_label::CSV.to_string()
                } else {
                    source_label::CSV_WIKIPEDIA_SUPPLEMENT.to_string()
                });
                csv_used = true;
            }
        }

        let korean_name = match korean {
            Some(name) if name.is_resolved() => name,
            _ => {
                source = Some(match source {
                    None => source_label::AI_UNVERIFIED.to_string(),
                    Some(label) => format!("{}{}", label, source_label::KOREAN_UNCONFIRMED_SUFFIX),
                });
                if common != NOT_AVAILABLE {
                    KoreanName::Unresolved(common.clone())
                } else {
                    KoreanName::Unidentified
                }
            }
        };

        let source_label = source.unwrap_or_else(|| source_label::AI_UNVERIFIED.to_string());
        tracing::debug!(
            korean = %korean_name,
            common = %common,
            scientific = %scientific,
            source = %source_label,
            "name resolved"
        );

        ResolvedIdentification {
            korean_name,
            common_name: common,
            scientific_name: scientific,
            order,
            family,
            source_label,
            secondary_source_used: csv_used,
        }
    }

    /// 英名で照会し、ページが無ければ学名で再照会
    async fn lookup_encyclopedia(&self, raw: &RawIdentification) -> Option<ReferenceMatch> {
        let encyclopedia = self.encyclopedia?;
        let common = raw.common_name.as_deref()?;

        self.sink.line(&format!("  - {}에서 '{}' 검색 중...", encyclopedia.name(), common));
        let mut found = self.query_page(encyclopedia, common).await;

        if found.is_none() {
            if let Some(sci) = raw.scientific_name.as_deref() {
                self.sink.line(&format!("  - 영문명 실패, 학명 '{}'로 재검색...", sci));
                found = self.query_page(encyclopedia, sci).await;
            }
        }

        match &found {
            Some(hit) => self.sink.line(&format!(
                "  - {} 찾음: {} | {}",
                encyclopedia.name(),
                hit.korean_name,
                hit.common_name.as_deref().unwrap_or(common)
            )),
            None => self.sink.line(&format!("  - {} 결과 없음.", encyclopedia.name())),
        }

        found
    }

    async fn query_page(
        &self,
        encyclopedia: &dyn EncyclopediaLookup,
        title: &str,
    ) -> Option<ReferenceMatch> {
        match encyclopedia.page(title).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(title, error = %e, "encyclopedia lookup failed");
                self.sink.line(&format!("  - {} 조회 오류: {}", encyclopedia.name(), e));
                None
            }
        }
    }

    fn lookup_checklist(&self, scientific_name: Option<&str>) -> Option<ReferenceMatch> {
        let checklist = self.checklist?;
        let sci = scientific_name?;

        match checklist.korean_name(sci) {
            Ok(Some(hit)) => {
                self.sink.line("  - CSV 일치 항목 발견!");
                Some(hit)
            }
            Ok(None) => {
                self.sink.line(&format!("  - CSV에서 '{}' 찾지 못함", sci));
                None
            }
            Err(e) => {
                tracing::warn!(scientific_name = sci, error = %e, "checklist lookup failed");
                self.sink.line(&format!("  - CSV 조회 오류: {}", e));
                None
            }
        }
    }
}

fn or_not_available(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn is_resolved(korean: &Option<KoreanName>) -> bool {
    korean.as_ref().is_some_and(KoreanName::is_resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeWiki {
        pages: HashMap<String, ReferenceMatch>,
        failing: bool,
        queries: Mutex<Vec<String>>,
    }

    impl FakeWiki {
        fn with_page(mut self, title: &str, korean: &str, canonical: &str) -> Self {
            self.pages.insert(
                title.to_string(),
                ReferenceMatch::new(KoreanName::from_marked(korean), Some(canonical.to_string())),
            );
            self
        }
    }

    #[async_trait]
    impl EncyclopediaLookup for FakeWiki {
        fn name(&self) -> &str {
            "Wikipedia"
        }

        async fn page(&self, title: &str) -> Result<Option<ReferenceMatch>, LookupError> {
            self.queries.lock().unwrap().push(title.to_string());
            if self.failing {
                return Err(LookupError::Http("connection reset".to_string()));
            }
            Ok(self.pages.get(title).cloned())
        }
    }

    #[derive(Default)]
    struct FakeChecklist {
        names: HashMap<String, String>,
        failing: bool,
        calls: AtomicUsize,
    }

    impl FakeChecklist {
        fn with(mut self, sci: &str, korean: &str) -> Self {
            self.names.insert(sci.to_string(), korean.to_string());
            self
        }
    }

    impl ChecklistLookup for FakeChecklist {
        fn korean_name(&self, scientific_name: &str) -> Result<Option<ReferenceMatch>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                return Err(LookupError::Malformed("bad table".to_string()));
            }
            Ok(self
                .names
                .get(scientific_name)
                .map(|k| ReferenceMatch::new(KoreanName::from_marked(k), None)))
        }
    }

    fn raw(common: Option<&str>, sci: Option<&str>) -> RawIdentification {
        RawIdentification {
            common_name: common.map(str::to_string),
            scientific_name: sci.map(str::to_string),
            order: Some("Anseriformes".to_string()),
            family: Some("Anatidae".to_string()),
        }
    }

    #[tokio::test]
    async fn test_wikipedia_resolved_skips_csv() {
        let wiki = FakeWiki::default().with_page("Mallard", "청둥오리", "Mallard");
        let csv = FakeChecklist::default().with("Anas platyrhynchos", "다른이름");
        let resolver = NameResolver::new(Some(&wiki), Some(&csv), &NullSink);

        let result = resolver
            .resolve(&raw(Some("Mallard"), Some("Anas platyrhynchos")))
            .await;

        assert_eq!(result.korean_name, KoreanName::Resolved("청둥오리".to_string()));
        assert_eq!(result.source_label, "Wikipedia");
        assert!(!result.secondary_source_used);
        assert_eq!(csv.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wikipedia_title_overrides_common_name() {
        let wiki = FakeWiki::default().with_page("mallard duck", "청둥오리", "Mallard");
        let resolver = NameResolver::new(Some(&wiki), None, &NullSink);

        let result = resolver.resolve(&raw(Some("mallard duck"), None)).await;
        assert_eq!(result.common_name, "Mallard");
    }

    #[tokio::test]
    async fn test_wikipedia_retries_with_scientific_name() {
        let wiki = FakeWiki::default().with_page("Anas zonorhyncha", "흰뺨검둥오리", "Eastern spot-billed duck");
        let resolver = NameResolver::new(Some(&wiki), None, &NullSink);

        let result = resolver
            .resolve(&raw(Some("Spot-billed Duck"), Some("Anas zonorhyncha")))
            .await;

        assert_eq!(
            *wiki.queries.lock().unwrap(),
            vec!["Spot-billed Duck".to_string(), "Anas zonorhyncha".to_string()]
        );
        assert_eq!(result.korean_name.name(), "흰뺨검둥오리");
        assert_eq!(result.common_name, "Eastern spot-billed duck");
        assert_eq!(result.source_label, "Wikipedia");
    }

    #[tokio::test]
    async fn test_wikipedia_not_queried_without_common_name() {
        let wiki = FakeWiki::default().with_page("Anas platyrhynchos", "청둥오리", "Mallard");
        let csv = FakeChecklist::default().with("Anas platyrhynchos", "청둥오리");
        let resolver = NameResolver::new(Some(&wiki), Some(&csv), &NullSink);

        let result = resolver.resolve(&raw(None, Some("Anas platyrhynchos"))).await;

        assert!(wiki.queries.lock().unwrap().is_empty());
        assert_eq!(result.source_label, "CSV");
        assert_eq!(result.common_name, NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn test_wikipedia_unresolved_supplemented_by_csv() {
        let wiki = FakeWiki::default().with_page("Mallard", "*Mallard", "Mallard");
        let csv = FakeChecklist::default().with("Anas platyrhynchos", "청둥오리");
        let resolver = NameResolver::new(Some(&wiki), Some(&csv), &NullSink);

        let result = resolver
            .resolve(&raw(Some("Mallard"), Some("Anas platyrhynchos")))
            .await;

        assert_eq!(result.korean_name, KoreanName::Resolved("청둥오리".to_string()));
        assert_eq!(result.source_label, "Wikipedia+CSV");
        assert!(result.secondary_source_used);
        assert_eq!(csv.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_wikipedia_match_csv_hit() {
        let wiki = FakeWiki::default();
        let csv = FakeChecklist::default().with("Parus minor", "박새");
        let resolver = NameResolver::new(Some(&wiki), Some(&csv), &NullSink);

        let result = resolver.resolve(&raw(Some("Japanese Tit"), Some("Parus minor"))).await;

        assert_eq!(result.korean_name, KoreanName::Resolved("박새".to_string()));
        assert_eq!(result.source_label, "CSV");
        assert_eq!(result.common_name, "Japanese Tit");
        assert!(result.secondary_source_used);
    }

    #[tokio::test]
    async fn test_neither_resolves_uses_marked_common_name() {
        let wiki = FakeWiki::default();
        let csv = FakeChecklist::default();
        let resolver = NameResolver::new(Some(&wiki), Some(&csv), &NullSink);

        let result = resolver.resolve(&raw(Some("Mystery Bird"), Some("Avis ignota"))).await;

        assert_eq!(result.korean_name.to_string(), "*Mystery Bird");
        assert_eq!(result.source_label, "AI (unverified)");
        assert!(!result.secondary_source_used);
    }

    #[tokio::test]
    async fn test_partial_match_marks_unconfirmed() {
        let wiki = FakeWiki::default().with_page("Mallard", "*Mallard", "Mallard");
        let csv = FakeChecklist::default();
        let resolver = NameResolver::new(Some(&wiki), Some(&csv), &NullSink);

        let result = resolver
            .resolve(&raw(Some("Mallard"), Some("Anas platyrhynchos")))
            .await;

        assert_eq!(result.korean_name, KoreanName::Unresolved("Mallard".to_string()));
        assert_eq!(result.source_label, "Wikipedia (Korean name unconfirmed)");
        // 2回目の直接照会では再問い合わせしない
        assert_eq!(csv.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unidentified_when_no_common_name() {
        let resolver = NameResolver::new(None, None, &NullSink);

        let result = resolver.resolve(&raw(None, Some("Avis ignota"))).await;

        assert_eq!(result.korean_name, KoreanName::Unidentified);
        assert_eq!(result.korean_name.to_string(), "unidentified");
        assert_eq!(result.source_label, "AI (unverified)");
    }

    #[tokio::test]
    async fn test_lookup_errors_are_no_match() {
        let wiki = FakeWiki {
            failing: true,
            ..Default::default()
        };
        let csv = FakeChecklist {
            failing: true,
            ..Default::default()
        };
        let lines = Mutex::new(Vec::new());
        let sink = |m: &str| lines.lock().unwrap().push(m.to_string());
        let resolver = NameResolver::new(Some(&wiki), Some(&csv), &sink);

        let result = resolver
            .resolve(&raw(Some("Mallard"), Some("Anas platyrhynchos")))
            .await;

        assert_eq!(result.korean_name.to_string(), "*Mallard");
        assert_eq!(result.source_label, "AI (unverified)");
        assert!(lines.lock().unwrap().iter().any(|l| l.contains("조회 오류")));
    }

    #[tokio::test]
    async fn test_null_fields_seeded_with_not_available() {
        let resolver = NameResolver::new(None, None, &NullSink);
        let result = resolver
            .resolve(&RawIdentification {
                common_name: Some("Mallard".to_string()),
                ..Default::default()
            })
            .await;

        assert_eq!(result.scientific_name, NOT_AVAILABLE);
        assert_eq!(result.order, NOT_AVAILABLE);
        assert_eq!(result.family, NOT_AVAILABLE);
        assert_eq!(result.taxonomy_summary(), "목: N/A, 과: N/A");
    }

    #[tokio::test]
    async fn test_resolution_is_deterministic() {
        let wiki = FakeWiki::default().with_page("Mallard", "*Mallard", "Mallard");
        let csv = FakeChecklist::default().with("Anas platyrhynchos", "청둥오리");
        let resolver = NameResolver::new(Some(&wiki), Some(&csv), &NullSink);
        let input = raw(Some("Mallard"), Some("Anas platyrhynchos"));

        let first = resolver.resolve(&input).await;
        let second = resolver.resolve(&input).await;
        assert_eq!(first, second);
    }
}
