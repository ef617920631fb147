//! 探鳥記録の書き出し
//!
//! - `log_chronological.txt`: 処理順の記録
//! - `log_taxonomic.txt`: 目・科で並べたチェックリスト
//! - `observations.json`: 観察台帳（`report` で記録を作り直せる）

use crate::error::Result;
use bird_ai_common::{render_chronological, render_taxonomic, Observation};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

pub const CHRONOLOGICAL_LOG: &str = "log_chronological.txt";
pub const TAXONOMIC_LOG: &str = "log_taxonomic.txt";
pub const OBSERVATIONS_JSON: &str = "observations.json";

/// テキスト記録2種を書き出し、書いたファイルのパスを返す
pub fn write_logs(
    log_dir: &Path,
    observations: &[Observation],
    source_dir: &str,
    generated_at: NaiveDateTime,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(log_dir)?;

    let chronological = log_dir.join(CHRONOLOGICAL_LOG);
    std::fs::write(
        &chronological,
        render_chronological(observations, source_dir, generated_at),
    )?;

    let taxonomic = log_dir.join(TAXONOMIC_LOG);
    std::fs::write(&taxonomic, render_taxonomic(observations, generated_at))?;

    Ok(vec![chronological, taxonomic])
}

/// テキスト記録と台帳JSONをまとめて書き出す
pub fn export_run(
    log_dir: &Path,
    observations: &[Observation],
    source_dir: &str,
    generated_at: NaiveDateTime,
) -> Result<Vec<PathBuf>> {
    let mut written = write_logs(log_dir, observations, source_dir, generated_at)?;

    let json_path = log_dir.join(OBSERVATIONS_JSON);
    save_observations(&json_path, observations)?;
    written.push(json_path);

    Ok(written)
}

pub fn save_observations(path: &Path, observations: &[Observation]) -> Result<()> {
    let json = serde_json::to_string_pretty(observations)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_observations(path: &Path) -> Result<Vec<Observation>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
