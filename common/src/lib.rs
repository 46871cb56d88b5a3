//! CV Sorter Common Library
//!
//! 試験リストの分類エンジン本体（マスタ解析・照合・出力）。
//! CLIからファイル入出力を切り離して使う。

pub mod candidates;
pub mod error;
pub mod export;
pub mod matcher;
pub mod normalize;
pub mod render;
pub mod similarity;
pub mod taxonomy;
pub mod types;

pub use candidates::{parse_candidates, DEFAULT_END_MARKER};
pub use error::{Error, Result};
pub use matcher::{categorize, Alignment, AuditRow, Categorization, CategorizedResult, MatchOptions, MatchSource};
pub use normalize::{extract_year, normalize, StopWords};
pub use render::{render_audit_tsv, render_plain, render_rich, PlainTextOptions, RichDocument, RichTextOptions, Separator};
pub use similarity::ScoringProfile;
pub use taxonomy::Taxonomy;
pub use types::{Phase, Placement, StudyLine, UNCATEGORIZED};
