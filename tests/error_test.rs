//! エラーケーステスト
//!
//! 入力ファイルの欠落・文字コード・セクション欠落などのエラーハンドリングを検証

use cv_sorter::error::SorterError;
use cv_sorter::pipeline::{self, SortRequest};
use cv_sorter_common::{MatchOptions, DEFAULT_END_MARKER};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn sort_request(master: PathBuf, unsorted: PathBuf) -> SortRequest {
    SortRequest {
        master,
        master_b: None,
        unsorted,
        options: MatchOptions::default(),
        end_marker: DEFAULT_END_MARKER.to_string(),
    }
}

/// 存在しないマスタで分類した場合
#[test]
fn test_sort_missing_master() {
    let dir = tempdir().expect("Failed to create temp dir");
    let unsorted = dir.path().join("unsorted.txt");
    std::fs::write(&unsorted, "2020 Study\n").unwrap();

    let result = pipeline::categorize_files(&sort_request(PathBuf::from("/nonexistent/master.txt"), unsorted));
    assert!(matches!(result, Err(SorterError::FileNotFound(_))));
}

/// 存在しない副マスタ
#[test]
fn test_sort_missing_secondary_master() {
    let dir = tempdir().expect("Failed to create temp dir");
    let master = dir.path().join("master.txt");
    let unsorted = dir.path().join("unsorted.txt");
    std::fs::write(&master, "Phase I\nA\n2020 Study\n").unwrap();
    std::fs::write(&unsorted, "2020 Study\n").unwrap();

    let mut request = sort_request(master, unsorted);
    request.master_b = Some(dir.path().join("missing_b.txt"));
    assert!(matches!(pipeline::categorize_files(&request), Err(SorterError::FileNotFound(_))));
}

/// UTF-8 でない未整理リスト
#[test]
fn test_sort_non_utf8_unsorted() {
    let dir = tempdir().expect("Failed to create temp dir");
    let master = dir.path().join("master.txt");
    let unsorted = dir.path().join("unsorted.txt");
    std::fs::write(&master, "Phase I\nA\n2020 Study\n").unwrap();
    std::fs::write(&unsorted, b"2020 Caf\xE9 study\n").unwrap();

    let result = pipeline::categorize_files(&sort_request(master, unsorted));
    assert!(matches!(result, Err(SorterError::Encoding(_))));
}

/// 研究歴の見出しがないCV
#[test]
fn test_extract_missing_section() {
    let dir = tempdir().expect("Failed to create temp dir");
    let cv = dir.path().join("cv.txt");
    std::fs::write(&cv, "Name\nEducation\n2001 Degree\n").unwrap();

    let result = pipeline::extract_file(&cv, &dir.path().join("out.txt"), "Research Experience", "end");
    assert!(matches!(result, Err(SorterError::SectionNotFound(_))));
    assert!(!dir.path().join("out.txt").exists());
}

/// 存在しないマスタ一覧
#[test]
fn test_convert_missing_csv() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = pipeline::convert_master(
        Path::new("/nonexistent/list.csv"),
        &dir.path().join("c.txt"),
        &dir.path().join("b.txt"),
        false,
    );
    assert!(matches!(result, Err(SorterError::FileNotFound(_))));
}

/// 年の行がないマスタ一覧は変換しない
#[test]
fn test_convert_list_without_years() {
    let dir = tempdir().expect("Failed to create temp dir");
    let csv = dir.path().join("list.csv");
    std::fs::write(&csv, "Sponsor,Red,Public\nPhase I,,\n").unwrap();

    let out_c = dir.path().join("c.txt");
    let result = pipeline::convert_master(&csv, &out_c, &dir.path().join("b.txt"), true);
    assert!(matches!(result, Err(SorterError::InvalidMaster(_))));
    assert!(!out_c.exists());
}

/// 壊れた Excel
#[test]
fn test_convert_broken_xlsx() {
    let dir = tempdir().expect("Failed to create temp dir");
    let xlsx = dir.path().join("list.xlsx");
    std::fs::write(&xlsx, "not a zip").unwrap();

    let result = pipeline::convert_master(&xlsx, &dir.path().join("c.txt"), &dir.path().join("b.txt"), false);
    assert!(matches!(result, Err(SorterError::ExcelRead(_))));
}

/// SorterErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        SorterError::Config("テスト設定エラー".to_string()),
        SorterError::FileNotFound("master.txt".to_string()),
        SorterError::InvalidMaster("不正なマスタ".to_string()),
        SorterError::Encoding("unsorted.txt".to_string()),
        SorterError::SectionNotFound("Research Experience".to_string()),
        SorterError::ExcelRead("list.xlsx".to_string()),
        SorterError::ExcelGeneration("Excel生成エラー".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// セクション欠落のメッセージに見出しが入る
#[test]
fn test_section_not_found_message() {
    let display = format!("{}", SorterError::SectionNotFound("Research Experience".into()));
    assert!(display.contains("Research Experience"));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: SorterError = io_err.into();

    assert!(matches!(err, SorterError::Io(_)));
    let display = format!("{}", err);
    assert!(display.contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: SorterError = json_err.into();

    assert!(matches!(err, SorterError::JsonParse(_)));
}

/// common::Errorからの変換（透過的エラー）
#[test]
fn test_common_error_conversion() {
    let common_err = cv_sorter_common::Error::Workbook("ワークブックエラー".to_string());
    let err: SorterError = common_err.into();

    assert!(matches!(err, SorterError::Common(_)));
    assert!(format!("{}", err).contains("ワークブックエラー"));
}
