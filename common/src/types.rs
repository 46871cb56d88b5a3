//! 共有型定義
//!
//! - StudyLine: マスタ・候補の試験エントリ1件
//! - Phase: 試験フェーズ（閉じた集合）
//! - Buckets: Phase → Category → エントリの挿入順階層
//! - Placement: 出力される (年, テキスト)

use crate::normalize::{clean_whitespace, extract_year, normalize, strip_leading_year};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 未分類バケットのラベル（フェーズ・カテゴリ共通）
pub const UNCATEGORIZED: &str = "Uncategorized";

/// 試験フェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "Phase I")]
    PhaseI,
    #[serde(rename = "Phase II-IV")]
    PhaseIIToIV,
    /// 照合できなかった候補の受け皿
    #[serde(rename = "Uncategorized")]
    Uncategorized,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::PhaseI => "Phase I",
            Phase::PhaseIIToIV => "Phase II-IV",
            Phase::Uncategorized => UNCATEGORIZED,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 試験エントリ1件（構築後は不変）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyLine {
    year: Option<String>,
    raw_text: String,
    after_year_text: String,
    normalized_text: String,
}

impl StudyLine {
    /// 1行分のテキストから構築（空白は畳まれる）
    pub fn new(text: &str) -> Self {
        let raw_text = clean_whitespace(text);
        let year = extract_year(&raw_text);
        let after_year_text = strip_leading_year(&raw_text).trim().to_string();
        let normalized_text = normalize(&raw_text);
        Self {
            year,
            raw_text,
            after_year_text,
            normalized_text,
        }
    }

    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn after_year_text(&self) -> &str {
        &self.after_year_text
    }

    pub fn normalized_text(&self) -> &str {
        &self.normalized_text
    }
}

/// 出力される1エントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// 年（年なしの未分類候補は空文字）
    pub year: String,
    /// 年を除いた本文（照合時はマスタ正規表記）
    pub text: String,
}

impl Placement {
    /// 並べ替え用の年（不正・欠落は -1）
    pub fn sort_year(&self) -> i32 {
        self.year.parse().unwrap_or(-1)
    }
}

/// カテゴリ単位のバケット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBucket<T> {
    pub name: String,
    pub entries: Vec<T>,
}

/// フェーズ単位のバケット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseBucket<T> {
    pub phase: Phase,
    pub categories: Vec<CategoryBucket<T>>,
}

/// Phase → Category → エントリ の挿入順階層
///
/// 順序は初出順を保持し、再ソートしない。空カテゴリも保持する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buckets<T> {
    phases: Vec<PhaseBucket<T>>,
}

impl<T> Default for Buckets<T> {
    fn default() -> Self {
        Self { phases: Vec::new() }
    }
}

impl<T> Buckets<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// フェーズを（なければ末尾に）作成して返す
    pub fn ensure_phase(&mut self, phase: Phase) -> &mut PhaseBucket<T> {
        let idx = match self.phases.iter().position(|p| p.phase == phase) {
            Some(idx) => idx,
            None => {
                self.phases.push(PhaseBucket {
                    phase,
                    categories: Vec::new(),
                });
                self.phases.len() - 1
            }
        };
        &mut self.phases[idx]
    }

    /// (フェーズ, カテゴリ) を作成して返す
    pub fn ensure_category(&mut self, phase: Phase, category: &str) -> &mut CategoryBucket<T> {
        let phase_bucket = self.ensure_phase(phase);
        let idx = match phase_bucket.categories.iter().position(|c| c.name == category) {
            Some(idx) => idx,
            None => {
                phase_bucket.categories.push(CategoryBucket {
                    name: category.to_string(),
                    entries: Vec::new(),
                });
                phase_bucket.categories.len() - 1
            }
        };
        &mut phase_bucket.categories[idx]
    }

    pub fn push(&mut self, phase: Phase, category: &str, entry: T) {
        self.ensure_category(phase, category).entries.push(entry);
    }

    /// バケットの中身（存在しなければ None）
    pub fn get(&self, phase: Phase, category: &str) -> Option<&[T]> {
        self.phases
            .iter()
            .find(|p| p.phase == phase)?
            .categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.entries.as_slice())
    }

    pub fn phases(&self) -> &[PhaseBucket<T>] {
        &self.phases
    }

    /// 全エントリを階層順に平坦化
    pub fn iter_entries(&self) -> impl Iterator<Item = (Phase, &str, &T)> {
        self.phases.iter().flat_map(|p| {
            p.categories
                .iter()
                .flat_map(move |c| c.entries.iter().map(move |e| (p.phase, c.name.as_str(), e)))
        })
    }

    /// エントリ総数
    pub fn len(&self) -> usize {
        self.phases
            .iter()
            .flat_map(|p| p.categories.iter())
            .map(|c| c.entries.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 各カテゴリ内のエントリを並べ替え
    pub(crate) fn for_each_category_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Vec<T>),
    {
        for phase in &mut self.phases {
            for category in &mut phase.categories {
                f(&mut category.entries);
            }
        }
    }
}
