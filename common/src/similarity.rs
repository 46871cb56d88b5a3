//! 類似度スコア
//!
//! 正規化済み文字列2つの類似度を [0, 1] で返す。
//! - 文字列の最長一致ブロック比（Ratcliff/Obershelp）
//! - トークン集合の Jaccard 係数
//!
//! の加重和。重みと除外語はスコアリングプロファイルで切り替える。

use crate::normalize::{token_set_of_normalized, StopWords};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// スコアリングプロファイル
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringProfile {
    /// 文字列一致比の重み
    pub seq_weight: f64,
    /// トークン Jaccard の重み
    pub token_weight: f64,
    /// トークン集合から除外する語
    #[serde(skip)]
    pub stop_words: StopWords,
    /// 長い文字列で頻出文字を一致の起点に使わない
    pub autojunk: bool,
}

impl ScoringProfile {
    /// 単一マスタ照合用 (0.6 / 0.4)
    pub const SINGLE_MASTER: Self = Self {
        seq_weight: 0.6,
        token_weight: 0.4,
        stop_words: StopWords::Clinical,
        autojunk: true,
    };

    /// 主・副マスタ照合用 (0.7 / 0.3)
    pub const DUAL_MASTER: Self = Self {
        seq_weight: 0.7,
        token_weight: 0.3,
        stop_words: StopWords::Clinical,
        autojunk: true,
    };

    /// 副マスタの有無からプロファイルを選ぶ
    pub fn for_masters(has_secondary: bool) -> Self {
        if has_secondary {
            Self::DUAL_MASTER
        } else {
            Self::SINGLE_MASTER
        }
    }

    /// 正規化済み文字列2つのスコア
    pub fn score(&self, a: &str, b: &str) -> f64 {
        let seq = seq_ratio(a, b, self.autojunk);
        let jac = token_jaccard(a, b, self.stop_words);
        self.seq_weight * seq + self.token_weight * jac
    }
}

impl Default for ScoringProfile {
    fn default() -> Self {
        Self::SINGLE_MASTER
    }
}

/// トークン集合の Jaccard 係数（両方空なら 1.0、片方のみ空なら 0.0）
pub fn token_jaccard(a: &str, b: &str, stop_words: StopWords) -> f64 {
    let set_a = token_set_of_normalized(a, stop_words);
    let set_b = token_set_of_normalized(b, stop_words);
    match (set_a.is_empty(), set_b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => {
            let inter = set_a.intersection(&set_b).count();
            let union = set_a.union(&set_b).count();
            inter as f64 / union as f64
        }
    }
}

/// 最長一致ブロックによる類似度比 `2M / (|a| + |b|)`
///
/// 両方空なら 1.0、片方のみ空なら 0.0。
pub fn seq_ratio(a: &str, b: &str, autojunk: bool) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matcher = BlockMatcher::new(&a, &b, autojunk);
    let matched = matcher.matched_len(0, a.len(), 0, b.len());
    2.0 * matched as f64 / total as f64
}

/// b 側の文字→出現位置の索引を持つ一致探索器
struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// 一致の起点に使える文字の出現位置（頻出文字は除外済み）
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char], autojunk: bool) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }

        let n = b.len();
        if autojunk && n >= 200 {
            let ntest = n / 100 + 1;
            b2j.retain(|_, idxs| idxs.len() <= ntest);
        }

        Self { a, b, b2j }
    }

    /// a[alo..ahi] と b[blo..bhi] の最長一致 (i, j, size)
    ///
    /// 同長なら a 側で最も早く、次に b 側で最も早いものを返す。
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut new_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    new_j2len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = new_j2len;
        }

        // 索引から外した頻出文字で一致を前後に伸ばす
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }

    /// 区間内の一致ブロック長の総和
    fn matched_len(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> usize {
        let mut total = 0;
        let mut queue = vec![(alo, ahi, blo, bhi)];
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_seq_ratio_identity_and_empty() {
        assert!(close(seq_ratio("abc", "abc", true), 1.0));
        assert!(close(seq_ratio("", "", true), 1.0));
        assert!(close(seq_ratio("", "abc", true), 0.0));
        assert!(close(seq_ratio("abc", "", true), 0.0));
    }

    #[test]
    fn test_seq_ratio_known_values() {
        // difflib.SequenceMatcher(None, "abcd", "bcde").ratio() == 0.75
        assert!(close(seq_ratio("abcd", "bcde", true), 0.75));
        // difflib.SequenceMatcher(None, "private", "privet").ratio() == 10/13
        assert!(close(seq_ratio("private", "privet", true), 10.0 / 13.0));
    }

    #[test]
    fn test_seq_ratio_popular_chars_on_long_strings() {
        let run = "a".repeat(250);
        let a = format!("b{}", run);
        let b = format!("{}b", run);
        // 頻出文字 'a' は起点にならないので 'b' 1文字しか一致しない
        assert!(close(seq_ratio(&a, &b, true), 2.0 / 502.0));
        assert!(close(seq_ratio(&a, &b, false), 500.0 / 502.0));
        // 同一文字列は頻出文字でも前方伸長で全体一致
        assert!(close(seq_ratio(&run, &run, true), 1.0));
    }

    #[test]
    fn test_seq_ratio_matches_legacy_autojunk() {
        let x = "the quick brown fox jumps over the lazy dog ".repeat(6);
        let y = "the quick brown cat jumps over the lazy dog ".repeat(6);
        assert!(close(seq_ratio(&x, &y, true), 32.0 / 528.0));
        assert!(close(seq_ratio(&x, &y, false), 492.0 / 528.0));
    }

    #[test]
    fn test_token_jaccard() {
        assert!(close(token_jaccard("", "", StopWords::Clinical), 1.0));
        assert!(close(token_jaccard("drug", "", StopWords::Clinical), 0.0));
        assert!(close(token_jaccard("drug x", "drug y", StopWords::None), 1.0 / 3.0));
        // 除外語だけなら空集合同士
        assert!(close(token_jaccard("the study", "a phase", StopWords::Clinical), 1.0));
    }

    #[test]
    fn test_profile_weights() {
        let single = ScoringProfile::SINGLE_MASTER;
        assert!(close(single.score("drugx trial", "drugx trial"), 1.0));
        let dual = ScoringProfile::DUAL_MASTER;
        let s = dual.score("abcd", "bcde");
        // seq 0.75, tokens disjoint
        assert!(close(s, 0.7 * 0.75));
    }

    #[test]
    fn test_for_masters() {
        assert_eq!(ScoringProfile::for_masters(true), ScoringProfile::DUAL_MASTER);
        assert_eq!(ScoringProfile::for_masters(false), ScoringProfile::SINGLE_MASTER);
    }

    #[test]
    fn test_score_in_range() {
        let p = ScoringProfile::default();
        for (a, b) in [("x", "y"), ("alpha beta", "beta alpha"), ("", "q"), ("long text here", "long")] {
            let s = p.score(a, b);
            assert!((0.0..=1.0).contains(&s), "{} vs {} -> {}", a, b, s);
        }
    }
}
