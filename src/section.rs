//! CVテキストから研究歴セクションを抜き出す
//!
//! 開始: 見出しを含む最初の行（大文字小文字・空白の差を無視）。見出し行自体は含めない。
//! 終端: 開始より後で終端マーカーに一致する最初の行。なければ末尾まで。

use crate::error::{Result, SorterError};
use cv_sorter_common::candidates::parse_candidate_lines;

/// 終端マーカーの判定方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndMatch {
    /// 行全体が一致（試験リストの抽出）
    Exact,
    /// 行内に含まれる（年なし行の収集）
    Contains,
}

fn norm(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// セクション本文の行（見出し行と終端行を除く）
///
/// 空の終端マーカーは無効（末尾まで）として扱う。
pub fn section_lines<'a, 'b>(
    lines: &'b [&'a str],
    start_marker: &str,
    end_marker: &str,
    end_match: EndMatch,
) -> Result<&'b [&'a str]> {
    let start_norm = norm(start_marker);
    let end_norm = norm(end_marker);

    let start = lines
        .iter()
        .position(|line| norm(line).contains(&start_norm))
        .ok_or_else(|| SorterError::SectionNotFound(start_marker.to_string()))?;

    let body = &lines[start + 1..];
    let end = if end_norm.is_empty() {
        body.len()
    } else {
        body.iter()
            .position(|line| {
                let line = norm(line);
                match end_match {
                    EndMatch::Exact => line == end_norm,
                    EndMatch::Contains => line.contains(&end_norm),
                }
            })
            .unwrap_or(body.len())
    };

    tracing::debug!("セクション: {}行目から{}行", start + 1, end);
    Ok(&body[..end])
}

/// CVテキストから未整理リストの試験を取り出す
pub fn extract_studies(cv_text: &str, start_marker: &str, end_marker: &str) -> Result<Vec<String>> {
    let lines: Vec<&str> = cv_text.lines().collect();
    let region = section_lines(&lines, start_marker, end_marker, EndMatch::Exact)?;
    // 署名行に続きがあって範囲が閉じなくても、署名文以降は読まない
    Ok(parse_candidate_lines(region.iter().copied(), Some(end_marker)))
}

/// 未整理リスト形式（1試験ずつ空行区切り）
pub fn render_unsorted(studies: &[String]) -> String {
    studies.iter().map(|s| format!("{}\n\n", s)).collect()
}
