//! 年のない試験行の補完
//!
//! 研究歴セクションには年が抜けた試験行が混じることがある。
//! それらをマスタ一覧の (年, 公開表記) と照合し、閾値以上なら
//! `YYYY 公開表記` の行として未整理リストに加える。

use crate::error::Result;
use crate::section::{section_lines, EndMatch};
use cv_sorter_common::normalize::{clean_whitespace, YEAR_LINE_RE};
use cv_sorter_common::similarity::seq_ratio;
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref PUNCT_RE: Regex = Regex::new(r"[[:punct:]]").unwrap();
}

/// 監査TSVのヘッダー行
pub const RESOLVE_AUDIT_HEADER: &str = "candidate\tmatched_nonred\tscore";

/// 見出しと区別するための最小文字数（カンマを含む行は短くても候補）
const MIN_CANDIDATE_CHARS: usize = 40;

/// 補完できた行
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLine {
    pub candidate: String,
    pub year: String,
    pub matched_nonred: String,
    pub score: f64,
}

impl ResolvedLine {
    /// 未整理リストに入れる行
    pub fn line(&self) -> String {
        format!("{} {}", self.year, self.matched_nonred)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolveOutcome {
    /// 年なし候補の数
    pub candidates: usize,
    pub resolved: Vec<ResolvedLine>,
    /// 既存リストと補完行を重複除去して連結したもの
    pub merged: Vec<String>,
}

/// 照合用の正規化（小文字化、ASCII記号を空白に、空白の圧縮）
pub fn normalize_for_match(text: &str) -> String {
    clean_whitespace(&PUNCT_RE.replace_all(&text.to_lowercase(), " "))
}

/// 年で始まらず、試験らしい行（カンマを含むか十分に長い）を集める
pub fn collect_noyear_candidates(region: &[&str]) -> Vec<String> {
    region
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .filter(|line| !YEAR_LINE_RE.is_match(line))
        .filter(|line| line.contains(',') || line.chars().count() >= MIN_CANDIDATE_CHARS)
        .map(clean_whitespace)
        .collect()
}

/// 候補ごとに最も近い対応表の行を選び、閾値以上のものを返す（入力順）
pub fn resolve_candidates(candidates: &[String], mapping: &[(String, String)], threshold: f64) -> Vec<ResolvedLine> {
    let normalized: Vec<String> = mapping.iter().map(|(_, text)| normalize_for_match(text)).collect();

    candidates
        .par_iter()
        .map(|candidate| {
            let key = normalize_for_match(candidate);
            let mut best: Option<(usize, f64)> = None;
            for (idx, text) in normalized.iter().enumerate() {
                let score = seq_ratio(&key, text, true);
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((idx, score));
                }
            }
            let (idx, score) = best?;
            if score < threshold {
                tracing::debug!("補完なし {:.4} {}", score, candidate);
                return None;
            }
            let (year, text) = &mapping[idx];
            Some(ResolvedLine {
                candidate: candidate.clone(),
                year: year.clone(),
                matched_nonred: text.clone(),
                score,
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

/// 既存の未整理リストに補完行を足し、正規化キーで重複を除く（先勝ち）
pub fn merge_unsorted(base_text: &str, resolved: &[ResolvedLine]) -> Vec<String> {
    let mut seen = HashSet::new();
    base_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .chain(resolved.iter().map(ResolvedLine::line))
        .filter(|line| seen.insert(normalize_for_match(line)))
        .collect()
}

/// 補完の監査TSV
pub fn render_resolve_audit(rows: &[ResolvedLine]) -> String {
    let mut out = String::from(RESOLVE_AUDIT_HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&format!("{}\t{}\t{:.4}\n", row.candidate, row.matched_nonred, row.score));
    }
    out
}

/// CVテキストと対応表から補完し、既存リストとマージする
pub fn resolve(
    cv_text: &str,
    mapping: &[(String, String)],
    base_unsorted: &str,
    section_start: &str,
    section_end: &str,
    threshold: f64,
) -> Result<ResolveOutcome> {
    let lines: Vec<&str> = cv_text.lines().collect();
    let region = section_lines(&lines, section_start, section_end, EndMatch::Contains)?;
    let candidates = collect_noyear_candidates(region);
    let resolved = resolve_candidates(&candidates, mapping, threshold);
    let merged = merge_unsorted(base_unsorted, &resolved);

    tracing::info!(
        "年なし候補 {} 件中 {} 件を補完",
        candidates.len(),
        resolved.len()
    );

    Ok(ResolveOutcome {
        candidates: candidates.len(),
        resolved,
        merged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SorterError;

    fn mapping() -> Vec<(String, String)> {
        vec![
            ("2021".into(), "ABBVIE M14-123: A Phase 2 study of upadacitinib, Sub-I".into()),
            ("2019".into(), "AMGEN 20190001: Evaluation of evolocumab in adults".into()),
        ]
    }

    #[test]
    fn test_normalize_for_match() {
        assert_eq!(normalize_for_match("  ABBVIE M14-123:  A study, (x) "), "abbvie m14 123 a study x");
        assert_eq!(normalize_for_match("—"), "—");
    }

    #[test]
    fn test_collect_noyear_candidates() {
        let region = [
            "ABBVIE",
            "",
            "2021 ABBVIE M14-123: already has a year, fine",
            "ABBVIE M14-123: A Phase 2 study of upadacitinib, Sub-I",
            "This line is long enough to count as a study entry",
            "Short line",
        ];
        let cands = collect_noyear_candidates(&region);
        assert_eq!(
            cands,
            vec![
                "ABBVIE M14-123: A Phase 2 study of upadacitinib, Sub-I",
                "This line is long enough to count as a study entry",
            ]
        );
    }

    #[test]
    fn test_resolve_candidates_threshold() {
        let cands = vec![
            "ABBVIE M14-123 - A Phase 2 Study of Upadacitinib, Sub-I".to_string(),
            "Completely different text, nothing alike at all".to_string(),
        ];
        let resolved = resolve_candidates(&cands, &mapping(), 0.88);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].line(), "2021 ABBVIE M14-123: A Phase 2 study of upadacitinib, Sub-I");
        assert!((resolved[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_with_empty_mapping() {
        let cands = vec!["anything, really".to_string()];
        assert!(resolve_candidates(&cands, &[], 0.0).is_empty());
    }

    #[test]
    fn test_merge_unsorted_dedupes() {
        let resolved = vec![
            ResolvedLine {
                candidate: "c".into(),
                year: "2021".into(),
                matched_nonred: "New study".into(),
                score: 0.9,
            },
            ResolvedLine {
                candidate: "d".into(),
                year: "2020".into(),
                matched_nonred: "Existing: study".into(),
                score: 0.95,
            },
        ];
        let merged = merge_unsorted("2020 Existing study\n\n2019 Other\n\n2019 other\n", &resolved);
        assert_eq!(merged, vec!["2020 Existing study", "2019 Other", "2021 New study"]);
    }

    #[test]
    fn test_render_resolve_audit() {
        let rows = vec![ResolvedLine {
            candidate: "cand".into(),
            year: "2021".into(),
            matched_nonred: "text".into(),
            score: 0.912345,
        }];
        assert_eq!(render_resolve_audit(&rows), "candidate\tmatched_nonred\tscore\ncand\ttext\t0.9123\n");
    }

    #[test]
    fn test_resolve_end_to_end() {
        let cv = "Header\nResearch Experience\nABBVIE\nABBVIE M14-123: A Phase 2 study of upadacitinib, Sub-I\n\
By signing this form, I confirm that the information provided is accurate and reflects my current qualifications. Signature\n\
AMGEN 20190001: Evaluation of evolocumab in adults\n";
        let outcome = resolve(
            cv,
            &mapping(),
            "2022 Existing\n\n",
            "Research Experience",
            cv_sorter_common::DEFAULT_END_MARKER,
            0.88,
        )
        .unwrap();
        assert_eq!(outcome.candidates, 1);
        assert_eq!(
            outcome.merged,
            vec!["2022 Existing", "2021 ABBVIE M14-123: A Phase 2 study of upadacitinib, Sub-I"]
        );
    }

    #[test]
    fn test_resolve_missing_section() {
        let result = resolve("nothing here", &mapping(), "", "Research Experience", "end", 0.88);
        assert!(matches!(result, Err(SorterError::SectionNotFound(_))));
    }
}
