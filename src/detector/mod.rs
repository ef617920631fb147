//! 鳥の検出アダプタ
//!
//! 画像から候補領域（バウンディングボックス＋信頼度）を受け取り、
//! しきい値以上で最も信頼度の高い1件を選ぶ。

mod command;

pub use command::CommandDetector;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 検出対象のラベル
pub const BIRD_LABEL: &str = "bird";

/// 検出された候補領域
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// [x1, y1, x2, y2]（ピクセル座標）
    pub bbox: [f32; 4],
    pub confidence: f32,
    /// ラベルを返さない検出器では None
    #[serde(default)]
    pub label: Option<String>,
}

impl Detection {
    pub fn width(&self) -> f32 {
        (self.bbox[2] - self.bbox[0]).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.bbox[3] - self.bbox[1]).max(0.0)
    }

    fn is_bird(&self) -> bool {
        self.label
            .as_deref()
            .map_or(true, |label| label.eq_ignore_ascii_case(BIRD_LABEL))
    }
}

#[async_trait]
pub trait BirdDetector: Send + Sync {
    /// 画像内の候補をすべて返す（しきい値での絞り込みは呼び出し側）
    async fn detect(&self, image_path: &Path) -> Result<Vec<Detection>>;
}

/// しきい値以上の「鳥」から最も信頼度の高いものを選ぶ
pub fn select_best(detections: Vec<Detection>, threshold: f32) -> Option<Detection> {
    detections
        .into_iter()
        .filter(|d| d.confidence >= threshold && d.is_bird())
        .filter(|d| d.width() > 0.0 && d.height() > 0.0)
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(confidence: f32, label: Option<&str>) -> Detection {
        Detection {
            bbox: [10.0, 10.0, 110.0, 90.0],
            confidence,
            label: label.map(str::to_string),
        }
    }

    #[test]
    fn test_select_best_highest_confidence() {
        let best = select_best(vec![det(0.4, None), det(0.9, None), det(0.6, None)], 0.25).unwrap();
        assert_eq!(best.confidence, 0.9);
    }

    #[test]
    fn test_select_best_threshold_inclusive() {
        assert!(select_best(vec![det(0.25, None)], 0.25).is_some());
        assert!(select_best(vec![det(0.24, None)], 0.25).is_none());
    }

    #[test]
    fn test_select_best_ignores_other_labels() {
        let best = select_best(
            vec![det(0.95, Some("person")), det(0.5, Some("bird"))],
            0.25,
        )
        .unwrap();
        assert_eq!(best.label.as_deref(), Some("bird"));
    }

    #[test]
    fn test_select_best_empty() {
        assert!(select_best(Vec::new(), 0.25).is_none());
    }

    #[test]
    fn test_select_best_skips_degenerate_box() {
        let flat = Detection {
            bbox: [10.0, 10.0, 10.0, 50.0],
            confidence: 0.99,
            label: None,
        };
        assert!(select_best(vec![flat], 0.25).is_none());
    }
}
