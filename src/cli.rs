use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bird-ai")]
#[command(about = "야생 조류 사진 AI 식별・파일 정리・탐조 기록 생성 도구", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 상세 로그 출력
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 사진 폴더를 식별・정리하고 탐조 기록을 생성
    Run {
        /// 사진 폴더 경로
        #[arg(required = true)]
        folder: PathBuf,

        /// 출력 폴더 (기본: 사진 폴더/processed_birds_final)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 촬영 지역 (예: "South Korea")
        #[arg(short, long)]
        location: Option<String>,

        /// 조류 목록 파일 (CSV / xlsx)
        #[arg(short = 'd', long)]
        species_db: Option<PathBuf>,

        /// 객체 탐지 명령 (예: "python detect.py"). 이미지 경로가 마지막 인자로 전달됨
        #[arg(long)]
        detector: Option<String>,

        /// 객체 탐지를 건너뛰고 사진 전체를 AI에 전달
        #[arg(long, conflicts_with = "detector")]
        no_detector: bool,

        /// 탐지 신뢰도 임계값 (0.0-1.0)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// API 호출 간 대기 시간(초)
        #[arg(long)]
        delay: Option<u64>,

        /// 유료 플랜 모드 (대기 시간 단축)
        #[arg(long)]
        premium: bool,

        /// 회전・반전 이미지를 함께 보내지 않음
        #[arg(long)]
        no_augment: bool,

        /// Wikipedia 조회를 사용하지 않음
        #[arg(long)]
        no_wikipedia: bool,
    },

    /// 이름 하나를 Wikipedia / 조류 목록으로 검증 (사진 없이)
    Resolve {
        /// 영문명
        #[arg(short, long)]
        common: Option<String>,

        /// 학명
        #[arg(short, long)]
        scientific: Option<String>,

        /// 조류 목록 파일 (CSV / xlsx)
        #[arg(short = 'd', long)]
        species_db: Option<PathBuf>,

        /// Wikipedia 조회를 사용하지 않음
        #[arg(long)]
        no_wikipedia: bool,
    },

    /// 저장된 관찰 기록(JSON)에서 텍스트 기록을 다시 생성
    Report {
        /// observations.json 경로
        #[arg(required = true)]
        input: PathBuf,

        /// 출력 폴더 (기본: 입력 파일과 같은 폴더)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 기록에 표시할 대상 폴더
        #[arg(long)]
        source_dir: Option<String>,
    },

    /// 설정 표시
    Config {
        /// 설정 표시
        #[arg(long)]
        show: bool,
    },
}
