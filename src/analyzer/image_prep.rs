//! AIに送る画像の準備（切り抜き・リサイズ・補助ビュー・JPEGエンコード）

use crate::detector::Detection;
use crate::error::{BirdAiError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| BirdAiError::ImageLoad(format!("{}: {}", path.display(), e)))
}

/// 検出領域で切り抜く（画像外の座標は丸める）
pub fn crop_to_detection(image: &DynamicImage, detection: &Detection) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let clamp = |v: f32, max: u32| (v.max(0.0) as u32).min(max);

    let x1 = clamp(detection.bbox[0], width);
    let y1 = clamp(detection.bbox[1], height);
    let x2 = clamp(detection.bbox[2], width);
    let y2 = clamp(detection.bbox[3], height);

    if x2 <= x1 || y2 <= y1 {
        return image.clone();
    }

    image.crop_imm(x1, y1, x2 - x1, y2 - y1)
}

/// 送信用の画像一式
///
/// 先頭は `crop_size` 四方にリサイズした画像。`augment` なら
/// 90度回転・270度回転・左右反転・上下反転の4枚を続ける
pub fn prepare_views(image: &DynamicImage, crop_size: u32, augment: bool) -> Vec<DynamicImage> {
    let base = image.resize_exact(crop_size, crop_size, FilterType::Lanczos3);

    if !augment {
        return vec![base];
    }

    let views = vec![
        base.rotate90(),
        base.rotate270(),
        base.fliph(),
        base.flipv(),
    ];
    std::iter::once(base).chain(views).collect()
}

/// JPEGにしてBase64で返す
pub fn encode_jpeg_base64(image: &DynamicImage) -> Result<String> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| BirdAiError::ImageLoad(format!("JPEG 변환 실패: {}", e)))?;
    Ok(STANDARD.encode(buf.into_inner()))
}
