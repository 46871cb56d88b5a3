//! テキストファイルの読み書き
//!
//! マスタ・未整理リストは UTF-8 必須（BOMは除去）。
//! マスタ一覧CSVだけは Latin-1 へのフォールバックを許す。

use crate::error::{Result, SorterError};
use sha2::{Digest, Sha256};
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(SorterError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read(path)?)
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// UTF-8 テキストとして読む（不正なバイト列はエラー）
pub fn read_utf8(path: &Path) -> Result<String> {
    let bytes = read_bytes(path)?;
    String::from_utf8(strip_bom(&bytes).to_vec())
        .map_err(|e| SorterError::Encoding(format!("{}: {}", path.display(), e)))
}

/// UTF-8 で読み、失敗したら Latin-1 として読む
pub fn read_utf8_or_latin1(path: &Path) -> Result<String> {
    let bytes = read_bytes(path)?;
    let body = strip_bom(&bytes);
    match std::str::from_utf8(body) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => {
            tracing::warn!("UTF-8 として読めないため Latin-1 で読み込み: {}", path.display());
            Ok(body.iter().map(|&b| b as char).collect())
        }
    }
}

/// 親ディレクトリを作ってから書き込む
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// バイト列を書き込む（親ディレクトリも作成）
pub fn write_bytes(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// ファイルの SHA-256（16進）
pub fn sha256_file(path: &Path) -> Result<String> {
    let bytes = read_bytes(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
