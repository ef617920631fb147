//! 観察台帳
//!
//! 1回の実行で保存された写真の観察記録を処理順に保持する。
//! 追記のみで、追加済みの記録は変更しない。

use crate::types::{Observation, NOT_AVAILABLE};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    observations: Vec<Observation>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// 学名ベースの種数（学名不明は数えない）
    pub fn unique_species_count(&self) -> usize {
        unique_species_count(&self.observations)
    }

    /// 種リストが韓国名を補った件数
    pub fn csv_assisted_count(&self) -> usize {
        self.observations
            .iter()
            .filter(|o| o.identification.secondary_source_used)
            .count()
    }

    /// 目の数（不明を除く）
    pub fn order_count(&self) -> usize {
        self.observations
            .iter()
            .map(Observation::order)
            .filter(|order| *order != NOT_AVAILABLE)
            .collect::<HashSet<_>>()
            .len()
    }
}

pub(crate) fn unique_species_count(observations: &[Observation]) -> usize {
    observations
        .iter()
        .map(Observation::scientific_name)
        .filter(|sci| *sci != NOT_AVAILABLE)
        .collect::<HashSet<_>>()
        .len()
}
