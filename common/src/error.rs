//! エラー型定義

use thiserror::Error;

/// 共通エラー型
///
/// 照合エンジン自体は失敗しない（入力テキストに対して全域）。
/// ここに現れるのはシリアライズとワークブック生成の失敗のみ。
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
