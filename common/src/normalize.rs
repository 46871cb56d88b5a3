//! テキスト正規化モジュール
//!
//! 試験エントリの1行を比較用に正規化する。
//! 正規化は比較用の射影のみを作り、元テキスト（年を含む）は変更しない。
//!
//! ## 処理順
//! 1. 先頭の4桁年を除去
//! 2. 小文字化
//! 3. 3文字以上の `x` 連続（テンプレートのマスク）を除去
//! 4. 句読点を除去（`**` 強調マーカー含む）
//! 5. 空白を1つに畳んでトリム

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    /// 行頭の4桁年（新しい試験エントリの開始）
    pub static ref YEAR_LINE_RE: Regex = Regex::new(r"^\s*([0-9]{4})\b").unwrap();
    static ref LEADING_YEAR_RE: Regex = Regex::new(r"^\s*[0-9]{4}\s*").unwrap();
    static ref MULTI_X_RE: Regex = Regex::new(r"(?i)x{3,}").unwrap();
}

/// 臨床試験の定型語（トークン集合から除外）
pub const CLINICAL_STOP_WORDS: &[&str] = &[
    "a", "an", "the", "to", "of", "and", "in", "for", "with", "on", "by", "from",
    "study", "phase", "randomized", "openlabel", "double", "single", "dose",
    "multiple", "ascending", "participants", "healthy", "placebo", "controlled",
    "evaluate", "assess", "safety", "tolerability",
];

/// トークン集合から除外する語のセット
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopWords {
    /// 除外なし
    None,
    /// 冠詞・前置詞・臨床試験の定型語を除外
    #[default]
    Clinical,
}

impl StopWords {
    pub fn contains(&self, token: &str) -> bool {
        match self {
            StopWords::None => false,
            StopWords::Clinical => CLINICAL_STOP_WORDS.contains(&token),
        }
    }
}

/// タブを空白にし、連続空白を1つに畳んでトリム
pub fn clean_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 行頭の4桁年を取得
pub fn extract_year(text: &str) -> Option<String> {
    YEAR_LINE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// 行頭の4桁年と後続の空白を除去（年で始まらない行はそのまま）
pub fn strip_leading_year(text: &str) -> &str {
    if YEAR_LINE_RE.is_match(text) {
        match LEADING_YEAR_RE.find(text) {
            Some(m) => &text[m.end()..],
            None => text,
        }
    } else {
        text
    }
}

/// 句読点判定
///
/// ASCII句読点に加え、Wordが自動挿入するダッシュ・引用符・箇条書き記号も対象。
fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '\u{2013}' | '\u{2014}' | '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}'
                | '\u{2022}' | '\u{25CF}'
        )
}

/// 比較用に正規化
///
/// # Examples
/// ```
/// use cv_sorter_common::normalize::normalize;
///
/// assert_eq!(normalize("2023 **DrugX**: A Study, XXXX-01"), "drugx a study 01");
/// ```
pub fn normalize(text: &str) -> String {
    let lowered = strip_leading_year(text).to_lowercase();
    let unmasked = MULTI_X_RE.replace_all(&lowered, "");
    let stripped: String = unmasked.chars().filter(|c| !is_punctuation(*c)).collect();
    clean_whitespace(&stripped)
}

/// 正規化済み文字列をトークン集合に分割（年の再除去は行わない）
pub fn token_set_of_normalized(normalized: &str, stop_words: StopWords) -> BTreeSet<String> {
    normalized
        .split_whitespace()
        .filter(|t| !stop_words.contains(t))
        .map(str::to_string)
        .collect()
}

/// 正規化してからトークン集合を作る
pub fn token_set(text: &str, stop_words: StopWords) -> BTreeSet<String> {
    token_set_of_normalized(&normalize(text), stop_words)
}
