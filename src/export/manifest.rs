//! 一括実行の記録（run_manifest.json）

use crate::error::Result;
use crate::io::{sha256_file, write_text};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE_NAME: &str = "run_manifest.json";

/// ファイルとそのハッシュ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDigest {
    pub path: PathBuf,
    pub sha256: String,
}

impl FileDigest {
    pub fn of(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            sha256: sha256_file(path)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCounts {
    pub extracted: usize,
    pub noyear_candidates: usize,
    pub resolved: usize,
    pub unsorted: usize,
    pub master_entries: usize,
    pub matched: usize,
    pub unmatched: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunManifest {
    pub version: String,
    pub timestamp: DateTime<Local>,
    pub threshold: f64,
    pub resolve_threshold: f64,
    pub profile: String,
    pub counts: RunCounts,
    pub inputs: Vec<FileDigest>,
    pub outputs: Vec<FileDigest>,
}

impl RunManifest {
    pub fn save(&self, out_dir: &Path) -> Result<PathBuf> {
        let path = out_dir.join(MANIFEST_FILE_NAME);
        write_text(&path, &serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}
