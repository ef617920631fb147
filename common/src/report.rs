//! 探鳥記録のテキスト生成
//!
//! - 時間順記録: 台帳の順にそのまま出力
//! - 分類学的チェックリスト: 学名で重複除去（先勝ち）し、目・科でソートして見出しごとに出力
//!
//! 見た目のレポート（HTML等）向けに、種ごとのグループと観察期間も提供する。

use crate::ledger::unique_species_count;
use crate::types::{Observation, NOT_AVAILABLE};
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

const RULE: &str = "==================================================";
const THIN_RULE: &str = "--------------------------------------------------";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const UNKNOWN_TAXON: &str = "정보 없음";

/// 時間順の探鳥記録
pub fn render_chronological(
    observations: &[Observation],
    source_dir: &str,
    generated_at: NaiveDateTime,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{RULE}\n시간순 자동 탐조 기록\n{RULE}");
    let _ = writeln!(out, "기록 생성: {}", generated_at.format(TIMESTAMP_FORMAT));
    let _ = writeln!(out, "대상 폴더: {}", source_dir);
    let _ = writeln!(out, "처리 사진: {}개", observations.len());
    let _ = writeln!(out, "관찰 종: {}종", unique_species_count(observations));
    let _ = writeln!(out, "{RULE}\n");

    for o in observations {
        let timestamp = o
            .capture_datetime
            .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| "시간 정보 없음".to_string());

        let _ = writeln!(out, "▶ {}", timestamp);
        let _ = writeln!(out, "  - 국명: {}", o.korean_name());
        let _ = writeln!(out, "  - 영문명: {}", o.common_name());
        let _ = writeln!(out, "  - 학명: {}", o.scientific_name());
        let _ = writeln!(out, "  - 분류: {}", o.taxonomy_summary);
        let _ = writeln!(out, "  - 파일: {}", o.stored_filename);
        let _ = writeln!(out, "{THIN_RULE}");
    }

    out
}

/// チェックリストに載せる観察（学名ごとに最初の1件、目・科順）
///
/// 目・科が不明なものは最後に並ぶ。同じ目・科の中では処理順を保つ。
pub fn taxonomic_checklist(observations: &[Observation]) -> Vec<&Observation> {
    let mut seen = HashSet::new();
    let mut unique: Vec<&Observation> = Vec::new();

    for o in observations {
        let sci = o.scientific_name();
        if sci != NOT_AVAILABLE && seen.insert(sci) {
            unique.push(o);
        }
    }

    unique.sort_by(|a, b| taxon_key(a.order()).cmp(&taxon_key(b.order())).then_with(|| {
        taxon_key(a.family()).cmp(&taxon_key(b.family()))
    }));
    unique
}

/// 分類学的チェックリスト
pub fn render_taxonomic(observations: &[Observation], generated_at: NaiveDateTime) -> String {
    let checklist = taxonomic_checklist(observations);
    let mut out = String::new();

    let _ = writeln!(out, "{RULE}\n분류학적 체크리스트\n{RULE}");
    let _ = writeln!(out, "기록 생성: {}", generated_at.format(TIMESTAMP_FORMAT));
    let _ = writeln!(out, "처리 사진: {}개", observations.len());
    let _ = writeln!(out, "총 종수: {}종", checklist.len());
    let _ = writeln!(out, "{RULE}");

    let mut current_order: Option<&str> = None;
    let mut current_family: Option<&str> = None;

    for o in checklist {
        let order = display_taxon(o.order());
        let family = display_taxon(o.family());

        if current_order != Some(order) {
            current_order = Some(order);
            current_family = None;
            let _ = writeln!(out, "\n[목] {}", order);
        }
        if current_family != Some(family) {
            current_family = Some(family);
            let _ = writeln!(out, "  [과] {}", family);
        }
        let _ = writeln!(out, "    - {} ({})", o.korean_name(), o.common_name());
    }

    out
}

/// 学名ごとの観察グループ（チェックリスト順）
#[derive(Debug, Clone)]
pub struct SpeciesGroup<'a> {
    pub scientific_name: &'a str,
    pub observations: Vec<&'a Observation>,
}

impl<'a> SpeciesGroup<'a> {
    /// 代表（最初の観察）
    pub fn first(&self) -> &'a Observation {
        self.observations[0]
    }
}

pub fn species_groups(observations: &[Observation]) -> Vec<SpeciesGroup<'_>> {
    let mut groups: Vec<SpeciesGroup<'_>> = taxonomic_checklist(observations)
        .into_iter()
        .map(|o| SpeciesGroup {
            scientific_name: o.scientific_name(),
            observations: Vec::new(),
        })
        .collect();

    let index: HashMap<&str, usize> = groups
        .iter()
        .enumerate()
        .map(|(i, g)| (g.scientific_name, i))
        .collect();

    for o in observations {
        if let Some(&i) = index.get(o.scientific_name()) {
            groups[i].observations.push(o);
        }
    }

    groups
}

/// 観察期間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationSpan {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ObservationSpan {
    pub fn is_single_day(&self) -> bool {
        self.start.date() == self.end.date()
    }

    /// "2024년 06월 01일 (09:00 - 11:30)" または複数日の範囲
    pub fn describe(&self) -> String {
        if self.is_single_day() {
            format!(
                "{} ({} - {})",
                self.start.format("%Y년 %m월 %d일"),
                self.start.format("%H:%M"),
                self.end.format("%H:%M")
            )
        } else {
            format!(
                "{} ~ {}",
                self.start.format("%Y년 %m월 %d일 %H:%M"),
                self.end.format("%Y년 %m월 %d일 %H:%M")
            )
        }
    }
}

/// 撮影日時を持つ観察から期間を求める。1件も無ければ None
pub fn observation_span(observations: &[Observation]) -> Option<ObservationSpan> {
    let mut times = observations.iter().filter_map(|o| o.capture_datetime);
    let first = times.next()?;
    let (start, end) = times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
    Some(ObservationSpan { start, end })
}

fn taxon_key(value: &str) -> (bool, &str) {
    (is_unknown(value), value)
}

fn is_unknown(value: &str) -> bool {
    value.trim().is_empty() || value == NOT_AVAILABLE
}

fn display_taxon(value: &str) -> &str {
    if is_unknown(value) {
        UNKNOWN_TAXON
    } else {
        value
    }
}
