use anyhow::{Context, Result};
use bird_ai_common::report::{observation_span, species_groups};
use bird_ai_common::{
    ChecklistLookup, EncyclopediaLookup, LogSink, NameResolver, RawIdentification, SpeciesTable,
};
use bird_ai_rust::{analyzer, cli, config, detector, export, pipeline, reference};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use pipeline::{PhotoOutcome, Pipeline, PipelineConfig, PipelineDeps, RunObserver};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Run {
            folder,
            output,
            location,
            species_db,
            detector,
            no_detector,
            threshold,
            delay,
            premium,
            no_augment,
            no_wikipedia,
        } => {
            println!("🐦 bird-ai - 사진 식별・정리\n");

            // CLI指定で設定を上書き
            let mut config = config;
            if let Some(location) = location {
                config.location = location;
            }
            if let Some(threshold) = threshold {
                config.confidence_threshold = threshold;
            }
            if let Some(delay) = delay {
                config.api_delay_secs = delay;
            }
            if premium {
                config.premium = true;
            }
            if no_augment {
                config.augment_views = false;
            }
            if species_db.is_some() {
                config.species_db = species_db;
            }
            if let Some(command) = detector {
                config.detector_command = Some(command.split_whitespace().map(str::to_string).collect());
            }
            if no_detector {
                config.detector_command = None;
            }
            config.validate()?;

            // 1. AIクライアント（失敗したら写真に触れる前に終了）
            println!("[1/3] 준비 중...");
            let api_key = config.get_api_key()?;
            let timeout = Duration::from_secs(config.timeout_seconds);
            let identifier = analyzer::GeminiClient::new(api_key, &config.model, timeout)?;

            let command_detector = config
                .detector_command
                .clone()
                .map(detector::CommandDetector::new)
                .transpose()?;
            let wikipedia = if no_wikipedia {
                None
            } else {
                Some(reference::WikipediaClient::new(&config.wikipedia_language, timeout)?)
            };
            let species_table = match &config.species_db {
                Some(path) => Some(reference::load_species_db(path)?),
                None => None,
            };

            println!("  - 모델: {}", config.model);
            println!("  - 촬영지: {}", config.location);
            println!(
                "  - 객체 탐지: {}",
                if command_detector.is_some() { "사용" } else { "사용 안 함 (사진 전체)" }
            );
            println!(
                "  - 조류 목록: {}",
                species_table
                    .as_ref()
                    .map(|t| format!("{}종", t.len()))
                    .unwrap_or_else(|| "없음".into())
            );
            println!("✔ 준비 완료\n");

            // 2. 一括処理
            println!("[2/3] 사진 처리 중...");
            let cancel = Arc::new(AtomicBool::new(false));
            {
                let cancel = Arc::clone(&cancel);
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        cancel.store(true, Ordering::SeqCst);
                    }
                });
            }

            let progress = ProgressReporter::new();
            let mut pipeline_config = PipelineConfig::from_config(&config, &folder);
            if let Some(output) = output {
                pipeline_config = pipeline_config.with_output_dir(output);
            }

            let deps = PipelineDeps {
                detector: command_detector.as_ref().map(|d| d as &dyn detector::BirdDetector),
                identifier: &identifier,
                encyclopedia: wikipedia.as_ref().map(|w| w as &dyn EncyclopediaLookup),
                checklist: species_table.as_ref().map(|t| t as &dyn ChecklistLookup),
                sink: &progress,
                observer: Some(&progress as &dyn RunObserver),
            };

            let summary = Pipeline::new(pipeline_config.clone(), deps)
                .with_cancel_flag(cancel)
                .run()
                .await?;
            progress.finish();
            println!("✔ 처리 완료\n");

            // 3. 集計
            println!("[3/3] 결과 요약");
            println!("  - 사진: {}장 중 {}장 처리", summary.total, summary.processed);
            println!("  - 저장: {}장", summary.saved());
            println!("  - 건너뜀: {}장", summary.skipped);
            println!("  - 실패: {}장", summary.failed);
            println!("  - CSV 보완: {}건", summary.csv_assisted());
            println!("  - 관찰 종: {}종 ({}목)", summary.unique_species(), summary.order_count());
            if let Some(span) = summary.observation_span() {
                println!("  - 관찰 기간: {}", span.describe());
            }
            println!("  - 저장 폴더: {}", pipeline_config.output_dir.display());
            for path in &summary.log_files {
                println!("  - 기록: {}", path.display());
            }
            if let Some(error) = &summary.log_error {
                println!("  - 기록 저장 실패: {}", error);
            }

            if summary.cancelled {
                println!("\n⚠ 중단됨 (저장된 파일과 기록은 유지됩니다)");
            } else {
                println!("\n✅ 완료");
            }
        }

        Commands::Resolve {
            common,
            scientific,
            species_db,
            no_wikipedia,
        } => {
            println!("🔎 bird-ai - 이름 검증\n");

            let raw = RawIdentification {
                common_name: common,
                scientific_name: scientific,
                order: None,
                family: None,
            }
            .normalized();
            if !raw.is_identified() {
                anyhow::bail!("--common 또는 --scientific 중 하나는 지정해야 합니다");
            }

            let timeout = Duration::from_secs(config.timeout_seconds);
            let wikipedia = if no_wikipedia {
                None
            } else {
                Some(reference::WikipediaClient::new(&config.wikipedia_language, timeout)?)
            };
            let species_table: Option<SpeciesTable> = match species_db.or(config.species_db) {
                Some(path) => Some(reference::load_species_db(&path)?),
                None => None,
            };

            let sink = |line: &str| println!("{}", line);
            let resolver = NameResolver::new(
                wikipedia.as_ref().map(|w| w as &dyn EncyclopediaLookup),
                species_table.as_ref().map(|t| t as &dyn ChecklistLookup),
                &sink,
            );
            let resolved = resolver.resolve(&raw).await;

            println!();
            println!("국명: {}", resolved.korean_name);
            println!("영문명: {}", resolved.common_name);
            println!("학명: {}", resolved.scientific_name);
            println!("출처: {}", resolved.source_label);
        }

        Commands::Report {
            input,
            output,
            source_dir,
        } => {
            println!("📄 bird-ai - 기록 재생성\n");

            let observations = export::load_observations(&input)
                .with_context(|| format!("관찰 기록을 읽을 수 없습니다: {}", input.display()))?;
            let output_dir = output.unwrap_or_else(|| parent_dir(&input));
            let source_dir = source_dir.unwrap_or_else(|| output_dir.display().to_string());

            let generated_at = chrono::Local::now().naive_local();
            let written = export::write_logs(&output_dir, &observations, &source_dir, generated_at)?;

            println!("✔ 관찰 {}건", observations.len());
            if let Some(span) = observation_span(&observations) {
                println!("✔ 관찰 기간: {}", span.describe());
            }
            for path in written {
                println!("✔ 기록: {}", path.display());
            }

            println!("\n종별 사진 수:");
            for group in species_groups(&observations) {
                let first = group.first();
                println!(
                    "  - {} ({}): {}장",
                    first.korean_name(),
                    first.common_name(),
                    group.observations.len()
                );
            }
            println!("\n✅ 완료");
        }

        Commands::Config { show } => {
            if show {
                println!("설정 ({}):", Config::config_path()?.display());
                println!("  모델: {}", config.model);
                println!("  촬영지: {}", config.location);
                println!("  탐지 임계값: {}", config.confidence_threshold);
                println!("  이미지 크기: {}px", config.crop_size);
                println!("  보조 이미지: {}", if config.augment_views { "사용" } else { "사용 안 함" });
                println!("  API 대기: {}초 (유료 플랜: {}초)", config.api_delay_secs, config.premium_delay_secs);
                println!("  유료 플랜: {}", if config.premium { "예" } else { "아니오" });
                println!("  출력 폴더: {}/{}", config.output_folder, config.log_folder);
                println!("  Wikipedia: {}", config.wikipedia_language);
                println!(
                    "  조류 목록: {}",
                    config
                        .species_db
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "없음".into())
                );
                println!(
                    "  탐지 명령: {}",
                    config
                        .detector_command
                        .as_ref()
                        .map(|c| c.join(" "))
                        .unwrap_or_else(|| "없음".into())
                );
                println!(
                    "  API 키: {}",
                    if config.get_api_key().is_ok() { "설정됨" } else { "미설정" }
                );
            } else {
                println!("설정 파일: {}", Config::config_path()?.display());
                println!("--show 로 현재 설정을 표시합니다");
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "bird_ai_rust=debug,bird_ai_common=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 進捗バーと行出力をまとめる
struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {bar:30} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(12));
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl LogSink for ProgressReporter {
    fn line(&self, message: &str) {
        self.bar.println(message);
    }
}

impl RunObserver for ProgressReporter {
    fn started(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn photo_done(&self, _index: usize, outcome: &PhotoOutcome) {
        let message = match outcome {
            PhotoOutcome::Saved(observation) => observation.stored_filename.clone(),
            PhotoOutcome::Skipped(reason) => reason.to_string(),
            PhotoOutcome::Failed(_) => "실패".to_string(),
        };
        self.bar.set_message(message);
        self.bar.inc(1);
    }
}
