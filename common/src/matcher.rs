//! 照合・分類エンジン
//!
//! 候補の試験エントリを、同じ年のマスタエントリとの類似度で
//! (Phase, Category) に割り当てる。
//!
//! ## 処理フロー（候補ごと、入力順）
//! 1. 正規化後が空 → 未分類（スコア 0.0、照合しない）
//! 2. (年, 正規化テキスト) が主マスタと完全一致 → スコア 1.0 で確定（閾値無視）
//! 3. 主マスタの同年エントリで最大スコア ≥ 閾値 → 確定
//! 4. 副マスタの同年エントリで最大スコア ≥ 閾値 → 同じ位置の主マスタエントリで確定
//! 5. いずれも不成立 → 未分類（候補自身の年と本文を残す）
//!
//! 出力テキストは常に主マスタの正規表記。副マスタは再現率を上げるためだけに使う。
//! スコア計算は候補間で独立なので並列に行い、配置と監査行は入力順に適用する。

use crate::similarity::ScoringProfile;
use crate::taxonomy::{FlatEntry, Taxonomy};
use crate::types::{Buckets, Phase, Placement, StudyLine, UNCATEGORIZED};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

/// 分類結果（マスタと同じ階層 + 未分類バケット）
pub type CategorizedResult = Buckets<Placement>;

/// 照合オプション
#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    /// 類似度の閾値（この値以上で一致）
    pub threshold: f64,
    /// スコアの重みと除外語
    pub profile: ScoringProfile,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.80,
            profile: ScoringProfile::default(),
        }
    }
}

/// 照合の決め手
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Exact,
    Primary,
    Secondary,
    Unmatched,
    Empty,
}

/// 監査行（候補1件につき必ず1行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRow {
    /// 候補の元テキスト
    pub unsorted: String,
    /// 一致した主マスタの行（未一致は None）
    pub matched_master: Option<String>,
    pub phase: Option<Phase>,
    pub category: Option<String>,
    pub score: f64,
    pub source: MatchSource,
}

impl AuditRow {
    pub fn is_matched(&self) -> bool {
        self.matched_master.is_some()
    }
}

/// 主マスタと副マスタの位置対応
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum Alignment {
    /// 件数と年が位置ごとに一致
    Aligned,
    /// 形が食い違う（位置と年が一致するヒットのみ採用）
    Diverged {
        primary_len: usize,
        secondary_len: usize,
        first_mismatch: usize,
    },
}

/// 分類の出力一式
#[derive(Debug, Clone)]
pub struct Categorization {
    pub result: CategorizedResult,
    pub audit: Vec<AuditRow>,
    /// 副マスタ未指定なら None
    pub alignment: Option<Alignment>,
}

impl Categorization {
    /// 未分類になった候補数
    pub fn unmatched_count(&self) -> usize {
        self.audit.iter().filter(|row| !row.is_matched()).count()
    }
}

/// 平坦化マスタの年別索引
struct MasterIndex<'a> {
    flat: Vec<FlatEntry<'a>>,
    by_year: HashMap<&'a str, Vec<usize>>,
}

impl<'a> MasterIndex<'a> {
    fn new(taxonomy: &'a Taxonomy) -> Self {
        let flat = taxonomy.flatten();
        let mut by_year: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (idx, entry) in flat.iter().enumerate() {
            if let Some(year) = entry.line.year() {
                by_year.entry(year).or_default().push(idx);
            }
        }
        Self { flat, by_year }
    }

    /// 同年エントリの最大スコア（同点は先勝ち）
    fn best_same_year(&self, candidate: &StudyLine, profile: &ScoringProfile) -> Option<(usize, f64)> {
        let year = candidate.year()?;
        let mut best: Option<(usize, f64)> = None;
        for &idx in self.by_year.get(year)? {
            let score = profile.score(candidate.normalized_text(), self.flat[idx].line.normalized_text());
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((idx, score));
            }
        }
        best
    }
}

/// 候補1件の判定
#[derive(Debug, Clone, Copy)]
enum Decision {
    Empty,
    Matched {
        index: usize,
        score: f64,
        source: MatchSource,
    },
    Unmatched {
        best_score: f64,
    },
}

/// 主マスタ・副マスタの対応を検査
fn check_alignment(primary: &[FlatEntry<'_>], secondary: &[FlatEntry<'_>]) -> Alignment {
    let first_mismatch = primary
        .iter()
        .zip(secondary.iter())
        .position(|(p, s)| p.line.year() != s.line.year());

    match first_mismatch {
        None if primary.len() == secondary.len() => Alignment::Aligned,
        _ => Alignment::Diverged {
            primary_len: primary.len(),
            secondary_len: secondary.len(),
            first_mismatch: first_mismatch.unwrap_or_else(|| primary.len().min(secondary.len())),
        },
    }
}

struct Engine<'a> {
    primary: MasterIndex<'a>,
    secondary: Option<MasterIndex<'a>>,
    exact: HashMap<(&'a str, &'a str), usize>,
    alignment: Option<Alignment>,
    options: MatchOptions,
}

impl<'a> Engine<'a> {
    fn new(primary: &'a Taxonomy, secondary: Option<&'a Taxonomy>, options: MatchOptions) -> Self {
        let primary = MasterIndex::new(primary);
        let secondary = secondary.map(MasterIndex::new);

        let mut exact = HashMap::new();
        for (idx, entry) in primary.flat.iter().enumerate() {
            if let Some(year) = entry.line.year() {
                exact.entry((year, entry.line.normalized_text())).or_insert(idx);
            }
        }

        let alignment = secondary
            .as_ref()
            .map(|s| check_alignment(&primary.flat, &s.flat));

        Self {
            primary,
            secondary,
            exact,
            alignment,
            options,
        }
    }

    /// 副マスタの位置を主マスタの位置に写す
    fn map_secondary(&self, idx: usize) -> Option<usize> {
        match self.alignment {
            Some(Alignment::Aligned) => Some(idx),
            Some(Alignment::Diverged { .. }) => {
                let secondary = self.secondary.as_ref()?;
                let primary_entry = self.primary.flat.get(idx)?;
                let secondary_entry = secondary.flat.get(idx)?;
                (primary_entry.line.year() == secondary_entry.line.year()).then_some(idx)
            }
            None => None,
        }
    }

    fn decide(&self, candidate: &StudyLine) -> Decision {
        if candidate.normalized_text().is_empty() {
            return Decision::Empty;
        }

        if let Some(year) = candidate.year() {
            if let Some(&index) = self.exact.get(&(year, candidate.normalized_text())) {
                return Decision::Matched {
                    index,
                    score: 1.0,
                    source: MatchSource::Exact,
                };
            }
        }

        let threshold = self.options.threshold;
        let profile = &self.options.profile;
        let mut best_score = 0.0_f64;

        if let Some((index, score)) = self.primary.best_same_year(candidate, profile) {
            if score >= threshold {
                return Decision::Matched {
                    index,
                    score,
                    source: MatchSource::Primary,
                };
            }
            best_score = best_score.max(score);
        }

        if let Some(secondary) = &self.secondary {
            if let Some((idx, score)) = secondary.best_same_year(candidate, profile) {
                if score >= threshold {
                    if let Some(index) = self.map_secondary(idx) {
                        return Decision::Matched {
                            index,
                            score,
                            source: MatchSource::Secondary,
                        };
                    }
                    tracing::warn!(
                        "副マスタの {} 件目が主マスタと対応しないため未分類: {}",
                        idx + 1,
                        candidate.raw_text()
                    );
                }
                best_score = best_score.max(score);
            }
        }

        Decision::Unmatched { best_score }
    }
}

/// 候補リストをマスタで分類する
///
/// # Arguments
/// * `primary` - 主マスタ（出力テキストの出典）
/// * `secondary` - 副マスタ（照合のみ、位置で主マスタに対応）
/// * `candidates` - 候補（入力順）
/// * `options` - 閾値とスコアリングプロファイル
///
/// # Returns
/// 分類結果、監査行（候補と同数・同順）、副マスタの対応状況
pub fn categorize(
    primary: &Taxonomy,
    secondary: Option<&Taxonomy>,
    candidates: &[StudyLine],
    options: &MatchOptions,
) -> Categorization {
    let engine = Engine::new(primary, secondary, *options);

    if let Some(Alignment::Diverged {
        primary_len,
        secondary_len,
        first_mismatch,
    }) = engine.alignment
    {
        tracing::warn!(
            "主マスタ({}件)と副マスタ({}件)の対応が {} 件目で崩れています",
            primary_len,
            secondary_len,
            first_mismatch + 1
        );
    }

    // 主マスタの全バケットを空で用意
    let mut result = CategorizedResult::new();
    for phase in primary.phases() {
        result.ensure_phase(phase.phase);
        for category in &phase.categories {
            result.ensure_category(phase.phase, &category.name);
        }
    }
    result.ensure_category(Phase::Uncategorized, UNCATEGORIZED);

    let decisions: Vec<Decision> = candidates.par_iter().map(|c| engine.decide(c)).collect();

    let mut audit = Vec::with_capacity(candidates.len());
    for (candidate, decision) in candidates.iter().zip(decisions) {
        match decision {
            Decision::Matched { index, score, source } => {
                let entry = engine.primary.flat[index];
                let year = entry
                    .line
                    .year()
                    .or_else(|| candidate.year())
                    .unwrap_or_default()
                    .to_string();
                result.push(
                    entry.phase,
                    entry.category,
                    Placement {
                        year,
                        text: entry.line.after_year_text().to_string(),
                    },
                );
                tracing::debug!(
                    "{:?} {:.3} {} -> {} / {}",
                    source,
                    score,
                    candidate.raw_text(),
                    entry.phase,
                    entry.category
                );
                audit.push(AuditRow {
                    unsorted: candidate.raw_text().to_string(),
                    matched_master: Some(entry.line.raw_text().to_string()),
                    phase: Some(entry.phase),
                    category: Some(entry.category.to_string()),
                    score,
                    source,
                });
            }
            Decision::Empty | Decision::Unmatched { .. } => {
                let (score, source) = match decision {
                    Decision::Unmatched { best_score } => (best_score, MatchSource::Unmatched),
                    _ => (0.0, MatchSource::Empty),
                };
                result.push(
                    Phase::Uncategorized,
                    UNCATEGORIZED,
                    Placement {
                        year: candidate.year().unwrap_or_default().to_string(),
                        text: candidate.after_year_text().to_string(),
                    },
                );
                tracing::debug!("未分類 {:.3} {}", score, candidate.raw_text());
                audit.push(AuditRow {
                    unsorted: candidate.raw_text().to_string(),
                    matched_master: None,
                    phase: None,
                    category: None,
                    score,
                    source,
                });
            }
        }
    }

    // カテゴリ内を年の降順に（同年は到着順を保持）
    result.for_each_category_mut(|entries| entries.sort_by_key(|p| Reverse(p.sort_year())));

    Categorization {
        result,
        audit,
        alignment: engine.alignment,
    }
}
