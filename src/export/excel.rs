//! 監査Excelの書き出し（CLI版）
//!
//! ワークブックの中身は共通ライブラリで生成する。

use crate::error::{Result, SorterError};
use crate::io::write_bytes;
use cv_sorter_common::export::generate_audit_workbook;
use cv_sorter_common::AuditRow;
use std::path::Path;

pub fn write_audit_workbook(rows: &[AuditRow], output_path: &Path) -> Result<()> {
    let buffer = generate_audit_workbook(rows).map_err(|e| SorterError::ExcelGeneration(e.to_string()))?;
    write_bytes(output_path, &buffer)?;
    tracing::debug!("監査Excel {} bytes", buffer.len());
    Ok(())
}
