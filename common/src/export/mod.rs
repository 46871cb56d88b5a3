//! 出力ファイル生成のうちフロントエンド非依存の部分

#[cfg(feature = "excel")]
pub mod audit_xlsx;

#[cfg(feature = "excel")]
pub use audit_xlsx::generate_audit_workbook;
