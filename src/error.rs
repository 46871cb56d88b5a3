use thiserror::Error;

#[derive(Error, Debug)]
pub enum SorterError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("マスタファイルが不正: {0}")]
    InvalidMaster(String),

    #[error("UTF-8として読めません: {0}")]
    Encoding(String),

    #[error("セクション開始が見つかりません: \"{0}\"")]
    SectionNotFound(String),

    #[error("Excel読み込みエラー: {0}")]
    ExcelRead(String),

    #[error("Excel生成エラー: {0}")]
    ExcelGeneration(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] cv_sorter_common::Error),
}

pub type Result<T> = std::result::Result<T, SorterError>;
