//! CV Sorter
//!
//! CVの臨床試験リストをマスタ分類に沿って並べ替えるCLIの本体。
//! 分類エンジンは `cv_sorter_common`、ここはファイル入出力と各工程。

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod io;
pub mod master_list;
pub mod pipeline;
pub mod resolver;
pub mod section;
