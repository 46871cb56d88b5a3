use clap::{ArgAction, Parser, Subcommand};
use cv_sorter_common::ScoringProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cv-sorter")]
#[command(about = "CV臨床試験リストの分類・整形ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// sort の出力スタイル（未指定は設定ファイルの値）
#[derive(clap::Args, Debug, Clone, Default)]
pub struct StyleArgs {
    /// 年と名前の区切り (tab/spaces)
    #[arg(long)]
    pub indent_type: Option<IndentType>,

    /// spaces 時の空白数
    #[arg(long)]
    pub indent_size: Option<usize>,

    /// 名前部分を太字にする (true/false)
    #[arg(long, action = ArgAction::Set)]
    pub bold: Option<bool>,

    /// テキスト出力で太字を ** で表す (true/false)
    #[arg(long, action = ArgAction::Set)]
    pub text_bold_markers: Option<bool>,

    /// リッチテキストのぶら下げインデント（インチ）
    #[arg(long)]
    pub docx_indent: Option<f64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 未整理リストをマスタで分類して出力
    Sort {
        /// 主マスタ（公開表記）
        #[arg(long, required = true)]
        master: PathBuf,

        /// 副マスタ（レッドラベル表記、照合のみに使用）
        #[arg(long)]
        master_b: Option<PathBuf>,

        /// 未整理の試験リスト
        #[arg(long, required = true)]
        unsorted: PathBuf,

        /// 分類済みテキストの出力先
        #[arg(long, required = true)]
        out: PathBuf,

        /// 監査TSVの出力先
        #[arg(long)]
        audit: Option<PathBuf>,

        /// 類似度の閾値 (0.0-1.0)
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,

        #[command(flatten)]
        style: StyleArgs,

        /// リッチテキスト段落JSONの出力先
        #[arg(long)]
        rich_out: Option<PathBuf>,

        /// 監査Excelの出力先
        #[arg(long)]
        audit_xlsx: Option<PathBuf>,

        /// スコアリングプロファイル (auto/single-master/dual-master)
        #[arg(long, default_value = "auto")]
        profile: ProfileChoice,
    },

    /// マスタ一覧 (CSV/XLSX) を主・副マスタのテキストに変換
    Master {
        /// マスタ一覧 (A=年または見出し, B=レッドラベル, C=公開表記)
        #[arg(long, required = true)]
        csv: PathBuf,

        /// C列（公開表記）のマスタ出力先
        #[arg(long, required = true)]
        out_c: PathBuf,

        /// B列（レッドラベル）のマスタ出力先（省略時は <out-c>_COLB）
        #[arg(long)]
        out_b: Option<PathBuf>,

        /// 1行目を見出しとして読み飛ばす
        #[arg(long)]
        has_header: bool,
    },

    /// CVテキストから研究歴セクションを抜き出す
    Extract {
        /// CV（プレーンテキスト）
        #[arg(long, required = true)]
        cv: PathBuf,

        /// 未整理リストの出力先
        #[arg(long, required = true)]
        out: PathBuf,

        /// セクション開始の見出し
        #[arg(long)]
        section_start: Option<String>,

        /// セクション終端の文
        #[arg(long)]
        section_end: Option<String>,
    },

    /// 年のない試験行をマスタ一覧から補完して未整理リストに追加
    Resolve {
        /// CV（プレーンテキスト）
        #[arg(long, required = true)]
        cv: PathBuf,

        /// マスタ一覧 (A=年, C=公開表記)
        #[arg(long, required = true)]
        csv: PathBuf,

        /// 既存の未整理リスト
        #[arg(long, required = true)]
        in_unsorted: PathBuf,

        /// 出力先（入力と同じでもよい）
        #[arg(long, required = true)]
        out_unsorted: PathBuf,

        /// セクション開始の見出し
        #[arg(long)]
        section_start: Option<String>,

        /// セクション終端の文
        #[arg(long)]
        section_end: Option<String>,

        /// 類似度の閾値 (0.0-1.0)
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,

        /// 監査TSVの出力先
        #[arg(long)]
        audit: Option<PathBuf>,
    },

    /// 抽出から分類まで一括実行
    Run {
        /// CV（プレーンテキスト）
        #[arg(long, required = true)]
        cv: PathBuf,

        /// マスタ一覧 (CSV/XLSX)
        #[arg(long, required = true)]
        csv: PathBuf,

        /// 出力ディレクトリ
        #[arg(long, required = true)]
        out_dir: PathBuf,

        /// マスタ一覧の1行目を見出しとして読み飛ばす
        #[arg(long)]
        has_header: bool,

        /// 分類の閾値 (0.0-1.0)
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// 設定を表示/編集
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 既定の分類閾値を設定
        #[arg(long, value_parser = parse_threshold)]
        set_threshold: Option<f64>,

        /// 既定の空白数を設定
        #[arg(long)]
        set_indent_size: Option<usize>,
    },
}

/// ログフィルタの指定
///
/// `-v` なら debug。なければ `RUST_LOG` をそのまま使い、未設定（空）なら warn。
pub fn log_directives(verbose: bool, rust_log: Option<&str>) -> String {
    match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        _ if verbose => "debug".to_string(),
        Some(env) => env.to_string(),
        None => "warn".to_string(),
    }
}

/// 閾値は [0, 1] のみ受け付ける
pub fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid threshold: {}", s))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("Threshold must be between 0.0 and 1.0: {}", s))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentType {
    #[default]
    Tab,
    Spaces,
}

impl std::str::FromStr for IndentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tab" | "tabs" => Ok(IndentType::Tab),
            "spaces" | "space" => Ok(IndentType::Spaces),
            _ => Err(format!("Unknown indent type: {}. Use tab or spaces", s)),
        }
    }
}

impl std::fmt::Display for IndentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndentType::Tab => write!(f, "tab"),
            IndentType::Spaces => write!(f, "spaces"),
        }
    }
}

/// スコアリングプロファイルの選択
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProfileChoice {
    /// 副マスタの有無で決める
    #[default]
    Auto,
    SingleMaster,
    DualMaster,
}

impl ProfileChoice {
    pub fn resolve(&self, has_secondary: bool) -> ScoringProfile {
        match self {
            ProfileChoice::Auto => ScoringProfile::for_masters(has_secondary),
            ProfileChoice::SingleMaster => ScoringProfile::SINGLE_MASTER,
            ProfileChoice::DualMaster => ScoringProfile::DUAL_MASTER,
        }
    }
}

impl std::str::FromStr for ProfileChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "auto" => Ok(ProfileChoice::Auto),
            "single-master" | "single" => Ok(ProfileChoice::SingleMaster),
            "dual-master" | "dual" => Ok(ProfileChoice::DualMaster),
            _ => Err(format!(
                "Unknown profile: {}. Use auto, single-master, or dual-master",
                s
            )),
        }
    }
}

impl std::fmt::Display for ProfileChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileChoice::Auto => write!(f, "auto"),
            ProfileChoice::SingleMaster => write!(f, "single-master"),
            ProfileChoice::DualMaster => write!(f, "dual-master"),
        }
    }
}
