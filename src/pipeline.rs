//! 各工程のファイル入出力
//!
//! - sort: マスタ + 未整理リスト → 分類済みリスト・監査
//! - master: マスタ一覧 → 主・副マスタ
//! - extract: CV → 未整理リスト
//! - resolve: CV + マスタ一覧 → 年なし行を補完した未整理リスト
//! - run: 上記を一括実行して run_manifest.json を残す

use crate::config::Config;
use crate::error::Result;
use crate::export::manifest::{FileDigest, RunCounts, RunManifest};
use crate::export::{export_categorization, SortOutputs};
use crate::io::{read_utf8, read_utf8_or_latin1, write_text};
use crate::master_list::{MasterList, MasterTexts};
use crate::resolver::{self, render_resolve_audit, ResolveOutcome};
use crate::section::{extract_studies, render_unsorted};
use cv_sorter_common::{categorize, parse_candidates, Alignment, Categorization, MatchOptions, Taxonomy};
use std::path::{Path, PathBuf};

/// sort の入力
#[derive(Debug, Clone)]
pub struct SortRequest {
    pub master: PathBuf,
    pub master_b: Option<PathBuf>,
    pub unsorted: PathBuf,
    pub options: MatchOptions,
    /// 未整理リストの終端マーカー（空で無効）
    pub end_marker: String,
}

/// マスタと未整理リストを読んで分類する
pub fn categorize_files(request: &SortRequest) -> Result<(Categorization, usize)> {
    let primary = Taxonomy::parse(&read_utf8(&request.master)?);
    let secondary = match &request.master_b {
        Some(path) => Some(Taxonomy::parse(&read_utf8(path)?)),
        None => None,
    };
    let unsorted_text = read_utf8(&request.unsorted)?;
    let candidates = parse_candidates(&unsorted_text, Some(&request.end_marker));

    if primary.is_empty() {
        tracing::warn!("主マスタに試験がありません: {}", request.master.display());
    }
    tracing::info!(
        "主マスタ {} 件, 候補 {} 件, 閾値 {:.2}",
        primary.len(),
        candidates.len(),
        request.options.threshold
    );

    let categorization = categorize(&primary, secondary.as_ref(), &candidates, &request.options);
    for row in categorization.audit.iter().filter(|r| !r.is_matched()) {
        tracing::warn!("未分類 ({:.3}): {}", row.score, row.unsorted);
    }
    Ok((categorization, primary.len()))
}

/// 分類して書き出す
pub fn sort_files(request: &SortRequest, outputs: &SortOutputs, style: &Config) -> Result<Categorization> {
    let (categorization, _) = categorize_files(request)?;
    export_categorization(&categorization, outputs, style)?;
    Ok(categorization)
}

/// マスタ一覧を主・副マスタのテキストファイルに変換
pub fn convert_master(csv: &Path, out_c: &Path, out_b: &Path, has_header: bool) -> Result<MasterTexts> {
    let texts = MasterList::load(csv)?.to_master_texts(has_header);
    write_text(out_c, &texts.primary)?;
    write_text(out_b, &texts.secondary)?;
    Ok(texts)
}

/// CVから未整理リストを書き出す（試験数を返す）
pub fn extract_file(cv: &Path, out: &Path, section_start: &str, section_end: &str) -> Result<usize> {
    let studies = extract_studies(&read_utf8(cv)?, section_start, section_end)?;
    write_text(out, &render_unsorted(&studies))?;
    Ok(studies.len())
}

/// resolve の入力
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub cv: PathBuf,
    pub csv: PathBuf,
    pub in_unsorted: PathBuf,
    pub out_unsorted: PathBuf,
    pub section_start: String,
    pub section_end: String,
    pub threshold: f64,
    pub audit: Option<PathBuf>,
}

/// 年なし行を補完して未整理リストを更新
pub fn resolve_files(request: &ResolveRequest) -> Result<ResolveOutcome> {
    let cv_text = read_utf8(&request.cv)?;
    let mapping = MasterList::load(&request.csv)?.year_mapping();
    let base = read_utf8(&request.in_unsorted)?;

    let outcome = resolver::resolve(
        &cv_text,
        &mapping,
        &base,
        &request.section_start,
        &request.section_end,
        request.threshold,
    )?;

    write_text(&request.out_unsorted, &render_unsorted(&outcome.merged))?;
    if let Some(path) = &request.audit {
        write_text(path, &render_resolve_audit(&outcome.resolved))?;
    }
    Ok(outcome)
}

/// run の出力ファイル名
pub mod run_files {
    pub const UNSORTED: &str = "unsorted_studies.txt";
    pub const RESOLVE_AUDIT: &str = "noyear_resolve_audit.tsv";
    pub const MASTER: &str = "master.txt";
    pub const MASTER_B: &str = "master_COLB.txt";
    pub const SORTED: &str = "sorted_studies.txt";
    pub const AUDIT: &str = "sort_audit.tsv";
    pub const AUDIT_XLSX: &str = "sort_audit.xlsx";
    pub const RICH: &str = "sorted_studies.rich.json";
}

/// 抽出 → 補完 → マスタ変換 → 分類 を一括実行
pub fn run_all(cv: &Path, csv: &Path, out_dir: &Path, has_header: bool, config: &Config) -> Result<RunManifest> {
    std::fs::create_dir_all(out_dir)?;
    let unsorted = out_dir.join(run_files::UNSORTED);
    let resolve_audit = out_dir.join(run_files::RESOLVE_AUDIT);
    let master = out_dir.join(run_files::MASTER);
    let master_b = out_dir.join(run_files::MASTER_B);

    println!("[1/4] 研究歴を抽出中...");
    let extracted = extract_file(cv, &unsorted, &config.section_start, &config.section_end)?;
    println!("✔ {}件の試験を抽出\n", extracted);

    println!("[2/4] 年なし行を補完中...");
    let outcome = resolve_files(&ResolveRequest {
        cv: cv.to_path_buf(),
        csv: csv.to_path_buf(),
        in_unsorted: unsorted.clone(),
        out_unsorted: unsorted.clone(),
        section_start: config.section_start.clone(),
        section_end: config.section_end.clone(),
        threshold: config.resolve_threshold,
        audit: Some(resolve_audit.clone()),
    })?;
    println!("✔ {}件中 {}件を補完\n", outcome.candidates, outcome.resolved.len());

    println!("[3/4] マスタを変換中...");
    let texts = convert_master(csv, &master, &master_b, has_header)?;
    println!("✔ 見出し {}件, 試験 {}件\n", texts.headers, texts.studies);

    println!("[4/4] 分類中...");
    let request = SortRequest {
        master: master.clone(),
        master_b: Some(master_b.clone()),
        unsorted: unsorted.clone(),
        options: MatchOptions {
            threshold: config.threshold,
            profile: cv_sorter_common::ScoringProfile::DUAL_MASTER,
        },
        end_marker: config.section_end.clone(),
    };
    let outputs = SortOutputs {
        text: out_dir.join(run_files::SORTED),
        audit_tsv: Some(out_dir.join(run_files::AUDIT)),
        audit_xlsx: Some(out_dir.join(run_files::AUDIT_XLSX)),
        rich_json: Some(out_dir.join(run_files::RICH)),
    };
    let (categorization, master_entries) = categorize_files(&request)?;
    export_categorization(&categorization, &outputs, config)?;
    report_alignment(categorization.alignment);

    let unmatched = categorization.unmatched_count();
    let mut output_paths = vec![unsorted.as_path(), resolve_audit.as_path(), master.as_path(), master_b.as_path()];
    output_paths.extend(outputs.written());

    let manifest = RunManifest {
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Local::now(),
        threshold: config.threshold,
        resolve_threshold: config.resolve_threshold,
        profile: "dual-master".to_string(),
        counts: RunCounts {
            extracted,
            noyear_candidates: outcome.candidates,
            resolved: outcome.resolved.len(),
            unsorted: outcome.merged.len(),
            master_entries,
            matched: categorization.audit.len() - unmatched,
            unmatched,
        },
        inputs: vec![FileDigest::of(cv)?, FileDigest::of(csv)?],
        outputs: output_paths
            .into_iter()
            .map(FileDigest::of)
            .collect::<Result<Vec<_>>>()?,
    };
    manifest.save(out_dir)?;
    Ok(manifest)
}

/// 副マスタの対応状況を表示
pub fn report_alignment(alignment: Option<Alignment>) {
    if let Some(Alignment::Diverged {
        primary_len,
        secondary_len,
        first_mismatch,
    }) = alignment
    {
        println!(
            "⚠ 主マスタ({}件)と副マスタ({}件)の対応が {}件目で崩れています",
            primary_len,
            secondary_len,
            first_mismatch + 1
        );
    }
}
