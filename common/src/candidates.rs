//! 未整理の試験リスト（候補）パーサー
//!
//! 年で始まる行が新しいブロックを開始し、空行でブロックを閉じる。
//! 継続行は空白で連結する。最初の年より前の行は試験ではないので捨てる。
//! 終端マーカー（CVの署名文）が行内に現れたらそこで切り、以降は一切読まない。

use crate::normalize::{clean_whitespace, YEAR_LINE_RE};
use crate::types::StudyLine;

/// CVの署名欄の定型文（Research Experience セクションの終端）
pub const DEFAULT_END_MARKER: &str = "By signing this form, I confirm that the information provided is accurate and reflects my current qualifications.";

/// 候補テキストを1行1試験のリストに変換
///
/// # Arguments
/// * `text` - 候補リスト全体
/// * `end_marker` - 終端マーカー（None で無効）
pub fn parse_candidates(text: &str, end_marker: Option<&str>) -> Vec<StudyLine> {
    parse_candidate_lines(text.lines(), end_marker)
        .iter()
        .map(|line| StudyLine::new(line))
        .collect()
}

/// 行の列から試験テキスト（空白整形済み）を取り出す
pub fn parse_candidate_lines<'a, I>(lines: I, end_marker: Option<&str>) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut studies = Vec::new();
    let mut current: Option<String> = None;

    let flush = |current: &mut Option<String>, studies: &mut Vec<String>| {
        if let Some(block) = current.take() {
            studies.push(clean_whitespace(&block));
        }
    };

    for raw in lines {
        let (line, hit_end) = match end_marker.filter(|m| !m.is_empty()) {
            Some(marker) => match raw.find(marker) {
                Some(pos) => (&raw[..pos], true),
                None => (raw, false),
            },
            None => (raw, false),
        };

        if line.trim().is_empty() {
            flush(&mut current, &mut studies);
        } else if YEAR_LINE_RE.is_match(line) {
            flush(&mut current, &mut studies);
            current = Some(line.trim().to_string());
        } else if let Some(block) = current.as_mut() {
            block.push(' ');
            block.push_str(line.trim());
        }

        if hit_end {
            break;
        }
    }

    flush(&mut current, &mut studies);
    studies
}
