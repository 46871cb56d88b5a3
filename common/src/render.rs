//! 分類結果の出力
//!
//! - プレーンテキスト（年と名前をタブまたは空白で区切る）
//! - リッチテキスト段落モデル（外部の文書生成に渡すJSON）
//! - 監査TSV

use crate::matcher::{AuditRow, CategorizedResult};
use crate::types::UNCATEGORIZED;
use serde::{Deserialize, Serialize};

/// 強調マーカー（プレーンテキスト用）
pub const BOLD_MARKER: &str = "**";

/// 監査TSVのヘッダー行
pub const AUDIT_HEADER: &str = "Unsorted\tMatched_Master\tPhase\tCategory\tScore";

/// 年と名前の区切り
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "size")]
pub enum Separator {
    Tab,
    Spaces(usize),
}

impl Separator {
    pub fn as_string(&self) -> String {
        match self {
            Separator::Tab => "\t".to_string(),
            // 0 指定でも空白1つは入れる
            Separator::Spaces(n) => " ".repeat((*n).max(1)),
        }
    }
}

impl Default for Separator {
    fn default() -> Self {
        Separator::Tab
    }
}

/// 最初のコロンで「名前」と「残り」に分ける
///
/// コロンがなければ全体が名前で、残りは None。
pub fn split_name_protocol(after_year: &str) -> (&str, Option<&str>) {
    match after_year.find(':') {
        Some(idx) => (after_year[..idx].trim(), Some(after_year[idx + 1..].trim_start())),
        None => (after_year.trim(), None),
    }
}

/// プレーンテキスト出力オプション
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlainTextOptions {
    pub separator: Separator,
    /// 名前部分を強調する
    pub bold: bool,
    /// 強調をマーカー (`**name**`) で表す
    pub bold_markers: bool,
}

impl Default for PlainTextOptions {
    fn default() -> Self {
        Self {
            separator: Separator::default(),
            bold: true,
            bold_markers: false,
        }
    }
}

/// 1エントリをプレーンテキスト1行に
pub fn render_entry_line(year: &str, after_year: &str, options: &PlainTextOptions) -> String {
    let (name, remainder) = split_name_protocol(after_year);
    let sep = options.separator.as_string();
    let mut line = if options.bold && options.bold_markers {
        format!("{}{}{}{}{}", year, sep, BOLD_MARKER, name, BOLD_MARKER)
    } else {
        format!("{}{}{}", year, sep, name)
    };
    if let Some(remainder) = remainder {
        line.push(':');
        if !remainder.is_empty() {
            line.push(' ');
            line.push_str(remainder);
        }
    }
    line
}

/// 分類結果をプレーンテキストに
///
/// フェーズ行、カテゴリ行、エントリ行。カテゴリとフェーズの後に空行。
pub fn render_plain(result: &CategorizedResult, options: &PlainTextOptions) -> String {
    let mut out = String::new();
    for phase in result.phases() {
        out.push_str(phase.phase.label());
        out.push('\n');
        for category in &phase.categories {
            out.push_str(&category.name);
            out.push('\n');
            for entry in &category.entries {
                out.push_str(&render_entry_line(&entry.year, &entry.text, options));
                out.push('\n');
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// リッチテキストのラン
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichRun {
    pub text: String,
    pub bold: bool,
}

impl RichRun {
    fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), bold: false }
    }
}

/// 段落の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParagraphKind {
    PhaseHeading,
    CategoryHeading,
    Entry,
}

/// リッチテキストの段落
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichParagraph {
    pub kind: ParagraphKind,
    pub runs: Vec<RichRun>,
    /// ぶら下げインデント（インチ、タブ位置も同じ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hanging_indent_inches: Option<f64>,
}

impl RichParagraph {
    /// 段落の表示テキスト
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// 外部の文書生成に渡す段落列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichDocument {
    pub paragraphs: Vec<RichParagraph>,
}

/// リッチテキスト出力オプション
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RichTextOptions {
    pub bold: bool,
    pub hanging_indent_inches: f64,
}

impl Default for RichTextOptions {
    fn default() -> Self {
        Self {
            bold: true,
            hanging_indent_inches: 0.5,
        }
    }
}

/// 1エントリをリッチテキスト段落に
pub fn render_entry_paragraph(year: &str, after_year: &str, options: &RichTextOptions) -> RichParagraph {
    let (name, remainder) = split_name_protocol(after_year);
    let mut runs = vec![
        RichRun::plain(year),
        RichRun::plain("\t"),
        RichRun {
            text: name.to_string(),
            bold: options.bold,
        },
    ];
    if let Some(remainder) = remainder {
        runs.push(RichRun::plain(":"));
        if !remainder.is_empty() {
            runs.push(RichRun::plain(format!(" {}", remainder)));
        }
    }
    RichParagraph {
        kind: ParagraphKind::Entry,
        runs,
        hanging_indent_inches: Some(options.hanging_indent_inches),
    }
}

/// 分類結果をリッチテキスト段落列に
pub fn render_rich(result: &CategorizedResult, options: &RichTextOptions) -> RichDocument {
    let heading = |kind, text: &str| RichParagraph {
        kind,
        runs: vec![RichRun {
            text: text.to_string(),
            bold: true,
        }],
        hanging_indent_inches: None,
    };

    let mut paragraphs = Vec::new();
    for phase in result.phases() {
        paragraphs.push(heading(ParagraphKind::PhaseHeading, phase.phase.label()));
        for category in &phase.categories {
            paragraphs.push(heading(ParagraphKind::CategoryHeading, &category.name));
            for entry in &category.entries {
                paragraphs.push(render_entry_paragraph(&entry.year, &entry.text, options));
            }
        }
    }
    RichDocument { paragraphs }
}

/// 監査行をTSVに（ヘッダー付き、入力順）
pub fn render_audit_tsv(rows: &[AuditRow]) -> String {
    let mut out = String::from(AUDIT_HEADER);
    out.push('\n');
    for row in rows {
        let phase = row.phase.map(|p| p.label()).unwrap_or(UNCATEGORIZED);
        let category = row.category.as_deref().unwrap_or(UNCATEGORIZED);
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{:.3}\n",
            row.unsorted,
            row.matched_master.as_deref().unwrap_or(""),
            phase,
            category,
            row.score
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{CategorizedResult, MatchSource};
    use crate::types::{Phase, Placement};

    fn sample() -> CategorizedResult {
        let mut result = CategorizedResult::new();
        result.push(
            Phase::PhaseI,
            "Oncology",
            Placement { year: "2023".into(), text: "DrugX: a study of...".into() },
        );
        result.push(
            Phase::PhaseI,
            "Oncology",
            Placement { year: "2021".into(), text: "No colon here".into() },
        );
        result.ensure_category(Phase::PhaseI, "Empty");
        result.push(
            Phase::Uncategorized,
            UNCATEGORIZED,
            Placement { year: "2019".into(), text: "Trailing colon:".into() },
        );
        result
    }

    #[test]
    fn test_split_name_protocol() {
        assert_eq!(split_name_protocol("DrugX: a study"), ("DrugX", Some("a study")));
        assert_eq!(split_name_protocol("  No colon  "), ("No colon", None));
        assert_eq!(split_name_protocol("Name:"), ("Name", Some("")));
        assert_eq!(split_name_protocol("A: b: c"), ("A", Some("b: c")));
    }

    #[test]
    fn test_render_plain_spaces() {
        let options = PlainTextOptions {
            separator: Separator::Spaces(1),
            ..Default::default()
        };
        let text = render_plain(&sample(), &options);
        let expected = "Phase I\nOncology\n2023 DrugX: a study of...\n2021 No colon here\n\nEmpty\n\n\n\
Uncategorized\nUncategorized\n2019 Trailing colon:\n\n\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_plain_tab_and_markers() {
        let options = PlainTextOptions {
            separator: Separator::Tab,
            bold: true,
            bold_markers: true,
        };
        assert_eq!(
            render_entry_line("2023", "DrugX: a study", &options),
            "2023\t**DrugX**: a study"
        );
        let no_bold = PlainTextOptions { bold: false, ..options };
        assert_eq!(render_entry_line("2023", "DrugX", &no_bold), "2023\tDrugX");
    }

    #[test]
    fn test_separator_default_is_tab() {
        assert_eq!(PlainTextOptions::default().separator.as_string(), "\t");
    }

    #[test]
    fn test_separator_spaces() {
        assert_eq!(Separator::Spaces(3).as_string(), "   ");
        assert_eq!(Separator::Spaces(0).as_string(), " ");
    }

    #[test]
    fn test_render_rich() {
        let doc = render_rich(&sample(), &RichTextOptions::default());
        assert_eq!(doc.paragraphs[0].kind, ParagraphKind::PhaseHeading);
        assert!(doc.paragraphs[0].runs[0].bold);

        let entry = &doc.paragraphs[2];
        assert_eq!(entry.kind, ParagraphKind::Entry);
        assert_eq!(entry.text(), "2023\tDrugX: a study of...");
        assert!(!entry.runs[0].bold);
        assert!(entry.runs[2].bold);
        assert_eq!(entry.hanging_indent_inches, Some(0.5));

        let no_colon = &doc.paragraphs[3];
        assert_eq!(no_colon.runs.len(), 3);
    }

    #[test]
    fn test_render_audit_tsv() {
        let rows = vec![
            AuditRow {
                unsorted: "2023 drugx".into(),
                matched_master: Some("2023 DrugX: a study".into()),
                phase: Some(Phase::PhaseI),
                category: Some("Oncology".into()),
                score: 0.91234,
                source: MatchSource::Primary,
            },
            AuditRow {
                unsorted: "2019 unknown".into(),
                matched_master: None,
                phase: None,
                category: None,
                score: 0.0,
                source: MatchSource::Unmatched,
            },
        ];
        let tsv = render_audit_tsv(&rows);
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines[0], AUDIT_HEADER);
        assert_eq!(lines[1], "2023 drugx\t2023 DrugX: a study\tPhase I\tOncology\t0.912");
        assert_eq!(lines[2], "2019 unknown\t\tUncategorized\tUncategorized\t0.000");
    }
}
