//! 写真フォルダ1件分の一括処理
//!
//! 写真ごとの流れ:
//! 1. 検出（設定時のみ）。しきい値以上の鳥がなければスキップ
//! 2. 切り抜き・季節を考慮したプロンプトでAI識別。名前が無ければスキップ
//! 3. 名前解決（Wikipedia → 種リスト）
//! 4. 新しい名前でコピー（RAWも）し、台帳に追加
//!
//! 1枚の失敗で全体は止めない。写真は列挙順に1枚ずつ処理する。

mod files;

pub use files::{save_photo, unique_stem, SavedFiles};

use crate::analyzer::image_prep::{crop_to_detection, load_image, prepare_views};
use crate::analyzer::{IdentifyError, SpeciesIdentifier};
use crate::config::Config;
use crate::detector::{select_best, BirdDetector};
use crate::error::Result;
use crate::export;
use crate::scanner::{self, ImageInfo};
use bird_ai_common::report::{observation_span, ObservationSpan};
use bird_ai_common::{
    build_base_name, build_identification_prompt, ChecklistLookup, EncyclopediaLookup, Ledger,
    LogSink, NameResolver, Observation,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// 1回の実行設定
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source_dir: PathBuf,
    /// リネームした写真のコピー先
    pub output_dir: PathBuf,
    /// 記録ファイルの出力先
    pub log_dir: PathBuf,
    pub location: String,
    pub confidence_threshold: f32,
    pub crop_size: u32,
    pub augment_views: bool,
    /// AI呼び出しの間隔
    pub pacing_delay: Duration,
}

impl PipelineConfig {
    /// 設定ファイルの値から作る（出力先は写真フォルダの中）
    pub fn from_config(config: &Config, source_dir: &Path) -> Self {
        let output_dir = source_dir.join(&config.output_folder);
        let log_dir = output_dir.join(&config.log_folder);
        Self {
            source_dir: source_dir.to_path_buf(),
            output_dir,
            log_dir,
            location: config.location.clone(),
            confidence_threshold: config.confidence_threshold,
            crop_size: config.crop_size,
            augment_views: config.augment_views,
            pacing_delay: config.pacing_delay(),
        }
    }

    /// 出力先を変更（記録フォルダ名は維持）
    pub fn with_output_dir(mut self, output_dir: PathBuf) -> Self {
        let log_folder = self
            .log_dir
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "birding_logs".into());
        self.log_dir = output_dir.join(log_folder);
        self.output_dir = output_dir;
        self
    }
}

/// 外部の協力者（検出器・AI・参照元・進捗出力）
pub struct PipelineDeps<'a> {
    pub detector: Option<&'a dyn BirdDetector>,
    pub identifier: &'a dyn SpeciesIdentifier,
    pub encyclopedia: Option<&'a dyn EncyclopediaLookup>,
    pub checklist: Option<&'a dyn ChecklistLookup>,
    pub sink: &'a dyn LogSink,
    pub observer: Option<&'a dyn RunObserver>,
}

/// 進捗表示用の通知
pub trait RunObserver: Send + Sync {
    fn started(&self, _total: usize) {}

    fn photo_done(&self, _index: usize, _outcome: &PhotoOutcome) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoBird,
    NotIdentified,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoBird => write!(f, "새를 찾지 못함"),
            SkipReason::NotIdentified => write!(f, "AI 식별 실패"),
        }
    }
}

/// 写真1枚の処理結果
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoOutcome {
    Skipped(SkipReason),
    Saved(Observation),
    Failed(String),
}

/// 実行結果の集計
#[derive(Debug, Default)]
pub struct RunSummary {
    /// 対象フォルダの写真数
    pub total: usize,
    /// 処理を試みた写真数（中断時は total より少ない）
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub ledger: Ledger,
    /// 書き出した記録ファイル
    pub log_files: Vec<PathBuf>,
    /// 記録の書き出しに失敗した場合のエラー（集計は有効）
    pub log_error: Option<String>,
}

impl RunSummary {
    pub fn saved(&self) -> usize {
        self.ledger.len()
    }

    pub fn unique_species(&self) -> usize {
        self.ledger.unique_species_count()
    }

    pub fn csv_assisted(&self) -> usize {
        self.ledger.csv_assisted_count()
    }

    pub fn order_count(&self) -> usize {
        self.ledger.order_count()
    }

    pub fn observation_span(&self) -> Option<ObservationSpan> {
        observation_span(self.ledger.observations())
    }
}

/// AI呼び出しの間隔を空ける
struct Pacer {
    delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_call: Mutex::new(None),
        }
    }

    /// 前回の呼び出しから `delay` 経つまで待つ
    async fn wait(&self) {
        let last = self.last_call.lock().map(|guard| *guard).unwrap_or(None);
        if let Some(last) = last {
            let ready_at = last + self.delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
    }

    fn mark(&self) {
        if let Ok(mut guard) = self.last_call.lock() {
            *guard = Some(Instant::now());
        }
    }
}

pub struct Pipeline<'a> {
    config: PipelineConfig,
    deps: PipelineDeps<'a>,
    cancel: Arc<AtomicBool>,
    pacer: Pacer,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: PipelineConfig, deps: PipelineDeps<'a>) -> Self {
        let pacer = Pacer::new(config.pacing_delay);
        Self {
            config,
            deps,
            cancel: Arc::new(AtomicBool::new(false)),
            pacer,
        }
    }

    /// 中断フラグを共有する（写真ごとに確認）
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn narrate(&self, message: impl AsRef<str>) {
        self.deps.sink.line(message.as_ref());
    }

    /// フォルダ全体を処理して記録を書き出す
    ///
    /// エラーになるのはフォルダの走査と出力先の作成のみ。
    /// 写真ごとのエラーは集計に数え、記録の書き出し失敗は `log_error` に残す
    pub async fn run(&self) -> Result<RunSummary> {
        let images = scanner::scan_folder(&self.config.source_dir)?;
        std::fs::create_dir_all(&self.config.output_dir)?;

        let mut summary = RunSummary {
            total: images.len(),
            ..Default::default()
        };

        tracing::info!(
            source = %self.config.source_dir.display(),
            photos = images.len(),
            "run started"
        );
        self.narrate(format!("사진 {}장을 처리합니다", images.len()));
        if let Some(observer) = self.deps.observer {
            observer.started(images.len());
        }

        let resolver = NameResolver::new(
            self.deps.encyclopedia,
            self.deps.checklist,
            self.deps.sink,
        );

        for (index, image) in images.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                summary.cancelled = true;
                self.narrate("사용자 요청으로 중단했습니다. 저장된 파일은 유지됩니다");
                tracing::warn!(processed = summary.processed, "run cancelled");
                break;
            }

            self.narrate(format!(
                "[{}/{}] {} 처리 중...",
                index + 1,
                images.len(),
                image.file_name
            ));

            let outcome = self.process_photo(image, &resolver).await;
            summary.processed += 1;
            if let Some(observer) = self.deps.observer {
                observer.photo_done(index, &outcome);
            }

            match outcome {
                PhotoOutcome::Saved(observation) => summary.ledger.push(observation),
                PhotoOutcome::Skipped(reason) => {
                    self.narrate(format!("  - 건너뜀: {}", reason));
                    summary.skipped += 1;
                }
                PhotoOutcome::Failed(message) => {
                    self.narrate(format!("  - 실패: {}", message));
                    tracing::warn!(file = %image.file_name, error = %message, "photo failed");
                    summary.failed += 1;
                }
            }
        }

        let generated_at = chrono::Local::now().naive_local();
        match export::export_run(
            &self.config.log_dir,
            summary.ledger.observations(),
            &self.config.source_dir.display().to_string(),
            generated_at,
        ) {
            Ok(written) => summary.log_files = written,
            Err(e) => {
                self.narrate(format!("기록 저장 실패: {}", e));
                tracing::error!(log_dir = %self.config.log_dir.display(), error = %e, "log export failed");
                summary.log_error = Some(e.to_string());
            }
        }

        tracing::info!(
            saved = summary.saved(),
            skipped = summary.skipped,
            failed = summary.failed,
            "run finished"
        );
        Ok(summary)
    }

    /// 写真1枚を処理する（エラーは Failed に畳む）
    pub async fn process_photo(&self, image: &ImageInfo, resolver: &NameResolver<'_>) -> PhotoOutcome {
        match self.try_process(image, resolver).await {
            Ok(outcome) => outcome,
            Err(e) => PhotoOutcome::Failed(e.to_string()),
        }
    }

    async fn try_process(&self, image: &ImageInfo, resolver: &NameResolver<'_>) -> Result<PhotoOutcome> {
        // 1. 検出
        let detection = match self.deps.detector {
            Some(detector) => {
                let detections = detector.detect(&image.path).await?;
                match select_best(detections, self.config.confidence_threshold) {
                    Some(best) => {
                        self.narrate(format!("  - 새 검출 (신뢰도 {:.2})", best.confidence));
                        Some(best)
                    }
                    None => return Ok(PhotoOutcome::Skipped(SkipReason::NoBird)),
                }
            }
            None => None,
        };

        // 2. 識別
        let photo = load_image(&image.path)?;
        let region = match &detection {
            Some(best) => crop_to_detection(&photo, best),
            None => photo,
        };
        let views = prepare_views(&region, self.config.crop_size, self.config.augment_views);
        let prompt = build_identification_prompt(&self.config.location, image.captured.as_ref());

        self.pacer.wait().await;
        let identified = self.deps.identifier.identify(&prompt, &views).await;
        self.pacer.mark();

        let raw = match identified {
            Ok(raw) => raw.normalized(),
            Err(IdentifyError::Malformed(message)) => {
                tracing::debug!(file = %image.file_name, %message, "unreadable identification");
                return Ok(PhotoOutcome::Skipped(SkipReason::NotIdentified));
            }
            Err(IdentifyError::Api(e)) => return Err(e),
        };

        if !raw.is_identified() {
            return Ok(PhotoOutcome::Skipped(SkipReason::NotIdentified));
        }

        self.narrate(format!(
            "  - AI 식별: {} ({})",
            raw.common_name.as_deref().unwrap_or("?"),
            raw.scientific_name.as_deref().unwrap_or("?")
        ));

        // 3. 名前解決
        let resolved = resolver.resolve(&raw).await;
        self.narrate(format!(
            "  - 결과: {} [{}]",
            resolved.korean_name, resolved.source_label
        ));

        // 4. 保存
        let base_name = build_base_name(
            &resolved.korean_name,
            &resolved.common_name,
            &resolved.scientific_name,
            image.captured.as_ref(),
        );
        let saved = save_photo(&image.path, &self.config.output_dir, &base_name)?;
        self.narrate(format!("  - 저장: {}", saved.photo_name()));
        if let Some(raw_copy) = &saved.raw {
            self.narrate(format!("  - RAW 복사: {}", files::file_name_of(raw_copy)));
        }

        Ok(PhotoOutcome::Saved(Observation::new(
            resolved,
            image.captured,
            image.file_name.clone(),
            saved.photo_name(),
        )))
    }
}
