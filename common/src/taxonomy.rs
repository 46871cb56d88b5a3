//! マスタ試験リスト（タクソノミ）パーサー
//!
//! フラットなテキストのマスタを Phase → Category → StudyLine の階層に変換する。
//!
//! ```text
//! PHASE I
//! Healthy Adults
//! 2025 BMS: A Phase 1 ...
//!   (継続行)
//!
//! Oncology:
//! 2023 ...
//! ```
//!
//! パーサーは明示的な状態 [`ParserState`] を行ごとに畳み込む純粋関数として実装する。
//! 各遷移は新しい状態と、確定したイベント（フェーズ・カテゴリ・試験）を返す。

use crate::normalize::{clean_whitespace, YEAR_LINE_RE};
use crate::types::{Buckets, Phase, StudyLine, UNCATEGORIZED};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PHASE_I_RE: Vec<Regex> = vec![
        Regex::new(r"(?i)^\s*phase\s*i\s*[:.\-–—]?\s*$").unwrap(),
        Regex::new(r"(?i)^\s*phase\s*1\s*[:.\-–—]?\s*$").unwrap(),
    ];
    static ref PHASE_II_IV_RE: Vec<Regex> = vec![
        Regex::new(r"(?i)^\s*phase\s*ii\s*[\-–—/ ]*iv\s*[:.\-–—]?\s*$").unwrap(),
        Regex::new(r"(?i)^\s*phase\s*2\s*[\-–—/ ]*4\s*[:.\-–—]?\s*$").unwrap(),
    ];
    /// 箇条書きのカテゴリ見出し（`- Oncology:` など）
    static ref CATEGORY_BULLET_RE: Regex = Regex::new(r"^\s*[\-–—•●]\s*(.+?)\s*:?\s*$").unwrap();
}

/// マスタ階層（Phase → Category → StudyLine）
pub type Taxonomy = Buckets<StudyLine>;

/// フェーズ見出しを判定して正規ラベルを返す
pub fn parse_phase_header(line: &str) -> Option<Phase> {
    let stripped = line.trim();
    if PHASE_I_RE.iter().any(|re| re.is_match(stripped)) {
        return Some(Phase::PhaseI);
    }
    if PHASE_II_IV_RE.iter().any(|re| re.is_match(stripped)) {
        return Some(Phase::PhaseIIToIV);
    }
    None
}

/// カテゴリ見出しの名前を取り出す（箇条書き記号・末尾コロンを除去）
fn category_name(line: &str) -> String {
    if let Some(caps) = CATEGORY_BULLET_RE.captures(line) {
        if let Some(m) = caps.get(1) {
            return clean_whitespace(m.as_str());
        }
    }
    let stripped = line.trim();
    let stripped = stripped.strip_suffix(':').unwrap_or(stripped);
    clean_whitespace(stripped)
}

/// パーサーが確定させたイベント
#[derive(Debug, Clone, PartialEq)]
pub enum TaxonomyEvent {
    Phase(Phase),
    Category { phase: Phase, name: String },
    Study { phase: Phase, category: String, line: StudyLine },
}

/// 行単位パーサーの状態
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserState {
    phase: Option<Phase>,
    category: Option<String>,
    pending: Option<String>,
}

impl ParserState {
    /// 蓄積中の試験を確定
    fn commit(&mut self, events: &mut Vec<TaxonomyEvent>) {
        if let Some(text) = self.pending.take() {
            let phase = self.phase.unwrap_or(Phase::PhaseI);
            let category = self
                .category
                .clone()
                .unwrap_or_else(|| UNCATEGORIZED.to_string());
            events.push(TaxonomyEvent::Study {
                phase,
                category,
                line: StudyLine::new(&text),
            });
        }
    }

    /// 1行分の遷移
    pub fn step(mut self, line: &str) -> (Self, Vec<TaxonomyEvent>) {
        let mut events = Vec::new();

        if line.trim().is_empty() {
            self.commit(&mut events);
            return (self, events);
        }

        // フェーズ見出しが最優先
        if let Some(phase) = parse_phase_header(line) {
            self.commit(&mut events);
            self.phase = Some(phase);
            self.category = None;
            events.push(TaxonomyEvent::Phase(phase));
            return (self, events);
        }

        if YEAR_LINE_RE.is_match(line) {
            self.commit(&mut events);
            let phase = *self.phase.get_or_insert(Phase::PhaseI);
            if self.category.is_none() {
                self.category = Some(UNCATEGORIZED.to_string());
                events.push(TaxonomyEvent::Category {
                    phase,
                    name: UNCATEGORIZED.to_string(),
                });
            }
            self.pending = Some(line.trim().to_string());
            return (self, events);
        }

        // 試験の途中なら継続行
        if let Some(pending) = self.pending.as_mut() {
            pending.push(' ');
            pending.push_str(line.trim());
            return (self, events);
        }

        let name = category_name(line);
        if name.is_empty() {
            return (self, events);
        }
        let phase = *self.phase.get_or_insert(Phase::PhaseI);
        self.category = Some(name.clone());
        events.push(TaxonomyEvent::Category { phase, name });
        (self, events)
    }

    /// 入力終端での確定
    pub fn finish(mut self) -> Vec<TaxonomyEvent> {
        let mut events = Vec::new();
        self.commit(&mut events);
        events
    }
}

fn apply_event(taxonomy: &mut Taxonomy, event: TaxonomyEvent) {
    match event {
        TaxonomyEvent::Phase(phase) => {
            taxonomy.ensure_phase(phase);
        }
        TaxonomyEvent::Category { phase, name } => {
            taxonomy.ensure_category(phase, &name);
        }
        TaxonomyEvent::Study { phase, category, line } => {
            taxonomy.push(phase, &category, line);
        }
    }
}

impl Taxonomy {
    /// 行の列からマスタを構築
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let (state, mut taxonomy) = lines.into_iter().fold(
            (ParserState::default(), Taxonomy::new()),
            |(state, mut taxonomy), line| {
                let (next, events) = state.step(line);
                for event in events {
                    apply_event(&mut taxonomy, event);
                }
                (next, taxonomy)
            },
        );
        for event in state.finish() {
            apply_event(&mut taxonomy, event);
        }
        taxonomy
    }

    /// マスタテキスト全体から構築
    pub fn parse(text: &str) -> Self {
        Self::from_lines(text.lines())
    }

    /// 全試験を階層順に平坦化（副マスタとの位置対応に使う）
    pub fn flatten(&self) -> Vec<FlatEntry<'_>> {
        self.iter_entries()
            .map(|(phase, category, line)| FlatEntry { phase, category, line })
            .collect()
    }
}

/// 平坦化したマスタの1件
#[derive(Debug, Clone, Copy)]
pub struct FlatEntry<'a> {
    pub phase: Phase,
    pub category: &'a str,
    pub line: &'a StudyLine,
}
