//! 監査ワークブック生成
//!
//! 監査行を手作業レビュー用の Excel にする。未分類行は背景色で目立たせる。

use crate::error::{Error, Result};
use crate::matcher::AuditRow;
use crate::types::UNCATEGORIZED;
use rust_xlsxwriter::*;

const COLUMNS: [(&str, f64); 6] = [
    ("Unsorted", 70.0),
    ("Matched_Master", 70.0),
    ("Phase", 14.0),
    ("Category", 28.0),
    ("Score", 8.0),
    ("Source", 11.0),
];

fn xlsx_err(context: &str) -> impl Fn(XlsxError) -> Error + '_ {
    move |e| Error::Workbook(format!("{}: {}", context, e))
}

/// 監査行を xlsx バッファに
pub fn generate_audit_workbook(rows: &[AuditRow]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::RGB(0x333333))
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_border(FormatBorder::Hair)
        .set_border_color(Color::RGB(0xAAAAAA));

    let text_format = Format::new().set_text_wrap().set_align(FormatAlign::Top);
    let unmatched_format = text_format
        .clone()
        .set_background_color(Color::RGB(0xFFF2CC));
    let score_format = Format::new().set_num_format("0.000").set_align(FormatAlign::Top);
    let unmatched_score_format = score_format
        .clone()
        .set_background_color(Color::RGB(0xFFF2CC));

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Audit").map_err(xlsx_err("シート名設定エラー"))?;

    for (col, (label, width)) in COLUMNS.iter().enumerate() {
        let col = col as u16;
        worksheet
            .set_column_width(col, *width)
            .map_err(xlsx_err("列幅設定エラー"))?;
        worksheet
            .write_string_with_format(0, col, *label, &header_format)
            .map_err(xlsx_err("ヘッダー書き込みエラー"))?;
    }
    worksheet.set_freeze_panes(1, 0).map_err(xlsx_err("ウィンドウ枠固定エラー"))?;

    for (idx, row) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        let (fmt, num_fmt) = if row.is_matched() {
            (&text_format, &score_format)
        } else {
            (&unmatched_format, &unmatched_score_format)
        };

        let source = serde_json::to_value(row.source)?
            .as_str()
            .unwrap_or_default()
            .to_string();
        let cells = [
            row.unsorted.as_str(),
            row.matched_master.as_deref().unwrap_or(""),
            row.phase.map(|p| p.label()).unwrap_or(UNCATEGORIZED),
            row.category.as_deref().unwrap_or(UNCATEGORIZED),
        ];
        for (col, value) in cells.iter().enumerate() {
            worksheet
                .write_string_with_format(r, col as u16, *value, fmt)
                .map_err(xlsx_err("セル書き込みエラー"))?;
        }
        worksheet
            .write_number_with_format(r, 4, row.score, num_fmt)
            .map_err(xlsx_err("スコア書き込みエラー"))?;
        worksheet
            .write_string_with_format(r, 5, source, fmt)
            .map_err(xlsx_err("セル書き込みエラー"))?;
    }

    if !rows.is_empty() {
        worksheet
            .autofilter(0, 0, rows.len() as u32, (COLUMNS.len() - 1) as u16)
            .map_err(xlsx_err("オートフィルタ設定エラー"))?;
    }

    workbook.save_to_buffer().map_err(xlsx_err("Excel保存エラー"))
}
