use crate::error::{BirdAiError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    /// 撮影地（プロンプトのヒント）
    pub location: String,
    /// 検出の信頼度しきい値
    pub confidence_threshold: f32,
    /// AIに送る切り抜き画像の一辺(px)
    pub crop_size: u32,
    /// 回転・反転した画像も一緒に送る
    pub augment_views: bool,
    /// AI呼び出し後の待機秒数
    pub api_delay_secs: u64,
    /// 有料プラン（待機を短縮）
    pub premium: bool,
    pub premium_delay_secs: u64,
    pub timeout_seconds: u64,
    /// 写真フォルダ内に作る出力フォルダ名
    pub output_folder: String,
    /// 出力フォルダ内の記録フォルダ名
    pub log_folder: String,
    pub wikipedia_language: String,
    /// 種リスト（CSV / xlsx）
    pub species_db: Option<PathBuf>,
    /// 外部検出コマンド（画像パスを最後の引数として渡す）
    pub detector_command: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".into(),
            location: "South Korea".into(),
            confidence_threshold: 0.25,
            crop_size: 768,
            augment_views: true,
            api_delay_secs: 4,
            premium: false,
            premium_delay_secs: 0,
            timeout_seconds: 60,
            output_folder: "processed_birds_final".into(),
            log_folder: "birding_logs".into(),
            wikipedia_language: "en".into(),
            species_db: None,
            detector_command: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| BirdAiError::Config("홈 디렉터리를 찾을 수 없습니다".into()))?;
        Ok(home.join(".config").join("bird-ai").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(BirdAiError::Config(format!(
                "confidence_threshold는 0.0~1.0 범위여야 합니다: {}",
                self.confidence_threshold
            )));
        }
        if self.crop_size == 0 {
            return Err(BirdAiError::Config("crop_size는 0보다 커야 합니다".into()));
        }
        if self.output_folder.trim().is_empty() || self.log_folder.trim().is_empty() {
            return Err(BirdAiError::Config("출력 폴더 이름이 비어 있습니다".into()));
        }
        Ok(())
    }

    pub fn get_api_key(&self) -> Result<String> {
        // 環境変数を優先
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key.trim().to_string());
            }
        }

        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(BirdAiError::MissingApiKey)
    }

    /// AI呼び出し間の待機時間（プランにより異なる）
    pub fn pacing_delay(&self) -> Duration {
        if self.premium {
            Duration::from_secs(self.premium_delay_secs)
        } else {
            Duration::from_secs(self.api_delay_secs)
        }
    }
}
