pub mod excel;
pub mod manifest;

use crate::config::Config;
use crate::error::Result;
use crate::io::write_text;
use cv_sorter_common::render::{render_audit_tsv, render_plain, render_rich};
use cv_sorter_common::Categorization;
use std::path::{Path, PathBuf};

/// sort の出力先
#[derive(Debug, Clone, Default)]
pub struct SortOutputs {
    pub text: PathBuf,
    pub audit_tsv: Option<PathBuf>,
    pub audit_xlsx: Option<PathBuf>,
    pub rich_json: Option<PathBuf>,
}

impl SortOutputs {
    /// 書き出したファイル一覧
    pub fn written(&self) -> Vec<&Path> {
        std::iter::once(self.text.as_path())
            .chain(self.audit_tsv.as_deref())
            .chain(self.audit_xlsx.as_deref())
            .chain(self.rich_json.as_deref())
            .collect()
    }
}

/// 分類結果を各形式で書き出す
pub fn export_categorization(categorization: &Categorization, outputs: &SortOutputs, style: &Config) -> Result<()> {
    let text = render_plain(&categorization.result, &style.plain_text_options());
    write_text(&outputs.text, &text)?;
    println!("✔ 分類済みリスト: {}", outputs.text.display());

    if let Some(path) = &outputs.audit_tsv {
        write_text(path, &render_audit_tsv(&categorization.audit))?;
        println!("✔ 監査TSV: {}", path.display());
    }

    if let Some(path) = &outputs.audit_xlsx {
        println!("- 監査Excelを生成中...");
        excel::write_audit_workbook(&categorization.audit, path)?;
        println!("✔ 監査Excel: {}", path.display());
    }

    if let Some(path) = &outputs.rich_json {
        let doc = render_rich(&categorization.result, &style.rich_text_options());
        write_text(path, &serde_json::to_string_pretty(&doc)?)?;
        println!("✔ リッチテキストJSON: {}", path.display());
    }

    Ok(())
}
