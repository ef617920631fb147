use thiserror::Error;

#[derive(Error, Debug)]
pub enum BirdAiError {
    #[error("설정 오류: {0}")]
    Config(String),

    #[error("Gemini API 키가 설정되지 않았습니다. 환경 변수 GEMINI_API_KEY 또는 설정 파일의 api_key를 지정하세요")]
    MissingApiKey,

    #[error("파일을 찾을 수 없습니다: {0}")]
    FileNotFound(String),

    #[error("폴더를 찾을 수 없습니다: {0}")]
    FolderNotFound(String),

    #[error("이미지 로드 오류: {0}")]
    ImageLoad(String),

    #[error("API 호출 오류: {0}")]
    ApiCall(String),

    #[error("API 응답 파싱 실패: {0}")]
    ApiParse(String),

    #[error("객체 탐지 오류: {0}")]
    Detector(String),

    #[error("조류 목록 오류: {0}")]
    SpeciesDb(String),

    #[error("JSON 해석 오류: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO 오류: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BirdAiError>;
