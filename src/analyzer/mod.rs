//! AIによる種の識別
//!
//! 検出領域を切り抜いた画像（＋回転・反転画像）とプロンプトを送り、
//! 英名・学名・目・科の推定を受け取る。

mod gemini;
pub mod image_prep;

pub use gemini::GeminiClient;

use crate::error::BirdAiError;
use async_trait::async_trait;
use bird_ai_common::RawIdentification;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentifyError {
    /// 応答が読めない（識別失敗としてスキップ扱い）
    #[error("AI 응답 해석 실패: {0}")]
    Malformed(String),

    /// 通信・APIエラー（その写真は失敗扱い）
    #[error(transparent)]
    Api(#[from] BirdAiError),
}

#[async_trait]
pub trait SpeciesIdentifier: Send + Sync {
    /// 先頭が切り抜き画像、以降は補助ビュー
    async fn identify(
        &self,
        prompt: &str,
        images: &[DynamicImage],
    ) -> std::result::Result<RawIdentification, IdentifyError>;
}
