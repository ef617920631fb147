//! 種リスト（学名→韓国名）の読み込み
//!
//! CSV と スプレッドシート（xlsx / xls / xlsm / ods）に対応。
//! 列の判定（列名 / 位置）は読み込み時に一度だけ行う。

use crate::error::{BirdAiError, Result};
use bird_ai_common::SpeciesTable;
use calamine::{open_workbook_auto, Reader};
use std::path::Path;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "xlsb", "ods"];

pub fn load_species_db(path: &Path) -> Result<SpeciesTable> {
    if !path.is_file() {
        return Err(BirdAiError::FileNotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let table = if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        load_spreadsheet(path)?
    } else {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BirdAiError::SpeciesDb(format!("{}: {}", path.display(), e)))?;
        SpeciesTable::from_csv_str(&content)
    };

    tracing::info!(
        path = %path.display(),
        entries = table.len(),
        layout = ?table.layout(),
        "species database loaded"
    );
    Ok(table)
}

/// 最初のシートを読む
fn load_spreadsheet(path: &Path) -> Result<SpeciesTable> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| BirdAiError::SpeciesDb(format!("{}: {}", path.display(), e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| BirdAiError::SpeciesDb(format!("{}: 시트가 없습니다", path.display())))?
        .map_err(|e| BirdAiError::SpeciesDb(format!("{}: {}", path.display(), e)))?;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();

    Ok(SpeciesTable::from_rows(rows))
}
