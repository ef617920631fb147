//! 保存先のファイル名決定とコピー

use crate::error::Result;
use crate::scanner::find_raw_sidecar;
use std::path::{Path, PathBuf};

/// `.jpeg` も `.jpg` として保存する
const PHOTO_EXTENSION: &str = "jpg";

/// コピーしたファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFiles {
    pub photo: PathBuf,
    pub raw: Option<PathBuf>,
}

impl SavedFiles {
    pub fn photo_name(&self) -> String {
        file_name_of(&self.photo)
    }
}

/// 既存ファイルと衝突しない名前（拡張子なし）を選ぶ
///
/// `base` が使われていれば `base_1`, `base_2`, ... と番号を付ける。
/// `extensions` のいずれかと衝突する番号は使わない
pub fn unique_stem(dir: &Path, base: &str, extensions: &[&str]) -> String {
    let is_free = |stem: &str| {
        extensions
            .iter()
            .all(|ext| !dir.join(format!("{}.{}", stem, ext)).exists())
    };

    if is_free(base) {
        return base.to_string();
    }

    let mut counter = 1;
    loop {
        let candidate = format!("{}_{}", base, counter);
        if is_free(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// 写真（と同名のRAW）を新しい名前で出力フォルダへコピーする
///
/// 元ファイルは移動しない。写真は `.jpg`、RAWは小文字の拡張子で保存する
pub fn save_photo(source: &Path, output_dir: &Path, base_name: &str) -> Result<SavedFiles> {
    std::fs::create_dir_all(output_dir)?;

    let photo_ext = PHOTO_EXTENSION;
    let raw_source = find_raw_sidecar(source);
    let raw_ext = raw_source.as_deref().and_then(lowercase_extension);

    let mut extensions = vec![photo_ext];
    if let Some(ext) = raw_ext.as_deref() {
        extensions.push(ext);
    }

    let stem = unique_stem(output_dir, base_name, &extensions);

    let photo = output_dir.join(format!("{}.{}", stem, photo_ext));
    std::fs::copy(source, &photo)?;

    let raw = match (raw_source, raw_ext) {
        (Some(raw_source), Some(ext)) => {
            let dest = output_dir.join(format!("{}.{}", stem, ext));
            std::fs::copy(&raw_source, &dest)?;
            Some(dest)
        }
        _ => None,
    };

    Ok(SavedFiles { photo, raw })
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
