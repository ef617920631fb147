mod exif;

pub use self::exif::extract_datetime;

use crate::error::{BirdAiError, Result};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
    /// EXIFの撮影日時
    pub captured: Option<NaiveDateTime>,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// RAWファイルの拡張子（先に見つかったものを採用）
pub const RAW_EXTENSIONS: &[&str] = &["orf", "cr2", "cr3", "nef", "arw", "dng", "raf", "rw2"];

pub fn scan_folder(folder: &Path) -> Result<Vec<ImageInfo>> {
    if !folder.is_dir() {
        return Err(BirdAiError::FolderNotFound(folder.display().to_string()));
    }

    let mut images = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(1)  // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if let Some(ext) = path.extension() {
            if is_image_extension(&ext.to_string_lossy()) {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();

                images.push(ImageInfo {
                    path: path.to_path_buf(),
                    file_name,
                    captured: extract_datetime(path),
                });
            }
        }
    }

    // ファイル名でソート
    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(images)
}

/// JPEGか（大文字小文字を区別しない）
fn is_image_extension(ext: &str) -> bool {
    let lower = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&lower.as_str())
}

/// JPEGと同じ名前のRAWファイルを探す
///
/// 拡張子リストの順に小文字・大文字を確認し、最初に見つかったものを返す
pub fn find_raw_sidecar(image_path: &Path) -> Option<PathBuf> {
    let dir = image_path.parent()?;
    let stem = image_path.file_stem()?.to_string_lossy();

    RAW_EXTENSIONS
        .iter()
        .flat_map(|ext| [ext.to_string(), ext.to_ascii_uppercase()])
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|candidate| candidate.is_file())
}
