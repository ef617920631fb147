//! 外部コマンドによる検出
//!
//! 設定されたコマンドに画像パスを最後の引数として渡し、標準出力のJSONを読む。
//! 受け付ける形式:
//! - `[{"bbox": [x1, y1, x2, y2], "confidence": 0.9, "label": "bird"}, ...]`
//! - `{"detections": [...]}`

use super::{BirdDetector, Detection};
use crate::error::{BirdAiError, Result};
use async_trait::async_trait;
use bird_ai_common::extract_json;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

#[derive(Deserialize)]
#[serde(untagged)]
enum DetectorOutput {
    List(Vec<Detection>),
    Wrapped { detections: Vec<Detection> },
}

pub struct CommandDetector {
    program: String,
    args: Vec<String>,
}

impl CommandDetector {
    /// `["python", "detect.py", "--model", "yolov8x.pt"]` のような argv から作る
    pub fn new(argv: Vec<String>) -> Result<Self> {
        let mut iter = argv.into_iter();
        let program = iter
            .next()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| BirdAiError::Config("검출 명령이 비어 있습니다".into()))?;
        Ok(Self {
            program,
            args: iter.collect(),
        })
    }

    /// 空白区切りのコマンド文字列から作る
    pub fn from_command_line(command: &str) -> Result<Self> {
        Self::new(command.split_whitespace().map(str::to_string).collect())
    }
}

#[async_trait]
impl BirdDetector for CommandDetector {
    async fn detect(&self, image_path: &Path) -> Result<Vec<Detection>> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(image_path)
            .output()
            .await
            .map_err(|e| BirdAiError::Detector(format!("{} 실행 오류: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BirdAiError::Detector(format!(
                "{} failed (code {:?}): {}",
                self.program,
                output.status.code(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(program = %self.program, bytes = stdout.len(), "detector output");
        parse_detections(&stdout)
    }
}

pub(crate) fn parse_detections(stdout: &str) -> Result<Vec<Detection>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let json = extract_json(stdout)
        .map_err(|e| BirdAiError::Detector(format!("검출 결과 해석 실패: {}", e)))?;
    let parsed: DetectorOutput = serde_json::from_str(json)
        .map_err(|e| BirdAiError::Detector(format!("검출 결과 해석 실패: {}", e)))?;

    Ok(match parsed {
        DetectorOutput::List(detections) => detections,
        DetectorOutput::Wrapped { detections } => detections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detection_list() {
        let stdout = r#"[{"bbox": [1, 2, 30, 40], "confidence": 0.8, "label": "bird"}]"#;
        let detections = parse_detections(stdout).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox, [1.0, 2.0, 30.0, 40.0]);
        assert_eq!(detections[0].label.as_deref(), Some("bird"));
    }

    #[test]
    fn test_parse_wrapped_detections_without_label() {
        let stdout = "loading model...\n{\"detections\": [{\"bbox\": [0, 0, 5, 5], \"confidence\": 0.3}]}";
        let detections = parse_detections(stdout).unwrap();
        assert_eq!(detections.len(), 1);
        assert!(detections[0].label.is_none());
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_detections("  \n").unwrap().is_empty());
        assert!(parse_detections("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(matches!(parse_detections("no json"), Err(BirdAiError::Detector(_))));
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(CommandDetector::from_command_line("   ").is_err());
        let detector = CommandDetector::from_command_line("python detect.py --conf 0.1").unwrap();
        assert_eq!(detector.program, "python");
        assert_eq!(detector.args, vec!["detect.py", "--conf", "0.1"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_detect_runs_command() {
        let detector = CommandDetector::new(vec![
            "sh".into(),
            "-c".into(),
            r#"echo '[{"bbox":[0,0,10,10],"confidence":0.7}]'"#.into(),
        ])
        .unwrap();
        let detections = detector.detect(Path::new("ignored.jpg")).await.unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].confidence, 0.7);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_detect_failing_command() {
        let detector = CommandDetector::new(vec!["sh".into(), "-c".into(), "exit 3".into()]).unwrap();
        let result = detector.detect(Path::new("x.jpg")).await;
        assert!(matches!(result, Err(BirdAiError::Detector(_))));
    }
}
