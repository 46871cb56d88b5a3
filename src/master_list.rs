//! マスタ一覧の読み込みと主・副マスタへの変換
//!
//! 一覧は3列: A=年または見出し, B=レッドラベル表記, C=公開表記。
//! 年の行は `YYYY 本文` として、見出し行はそのまま両方のマスタに書く。
//! 見出しの直前が試験行なら空行を挟む（試験の継続行と誤読させない）。

use crate::error::{Result, SorterError};
use crate::io::read_utf8_or_latin1;
use calamine::{open_workbook_auto, Data, Reader};
use cv_sorter_common::normalize::clean_whitespace;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref YEAR_CELL_RE: Regex = Regex::new(r"^[0-9]{4}$").unwrap();
}

/// 一覧の1行（3列目までを使う）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterRow {
    pub col_a: String,
    pub col_b: String,
    pub col_c: String,
}

impl MasterRow {
    fn from_fields(fields: &[String]) -> Self {
        let get = |i: usize| fields.get(i).map(|s| s.trim().to_string()).unwrap_or_default();
        Self {
            col_a: get(0),
            col_b: get(1),
            col_c: get(2),
        }
    }

    fn is_blank(&self) -> bool {
        self.col_a.is_empty() && self.col_b.is_empty() && self.col_c.is_empty()
    }

    /// A列が4桁の年なら Some
    pub fn year(&self) -> Option<&str> {
        YEAR_CELL_RE.is_match(&self.col_a).then_some(self.col_a.as_str())
    }
}

/// 読み込んだ一覧。空レコードは除外済み
#[derive(Debug, Clone, Default)]
pub struct MasterList {
    pub rows: Vec<MasterRow>,
}

/// 変換結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterTexts {
    /// C列（公開表記）のマスタ
    pub primary: String,
    /// B列（レッドラベル）のマスタ
    pub secondary: String,
    pub studies: usize,
    pub headers: usize,
}

/// マスタテキストを1ファイル分書き進める
#[derive(Default)]
struct MasterWriter {
    text: String,
    last_was_study: bool,
}

impl MasterWriter {
    fn header(&mut self, header: &str) {
        if self.last_was_study {
            self.text.push('\n');
        }
        self.text.push_str(header);
        self.text.push('\n');
        self.last_was_study = false;
    }

    fn study(&mut self, year: &str, desc: &str) {
        self.text.push_str(year);
        self.text.push(' ');
        self.text.push_str(desc);
        self.text.push('\n');
        self.last_was_study = true;
    }
}

impl MasterList {
    /// 拡張子で CSV / Excel を判定して読む
    ///
    /// A列に年の行が1つもなければ一覧として不正。
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(SorterError::FileNotFound(path.display().to_string()));
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let list = match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => Self::load_workbook(path)?,
            _ => Self::from_csv(&read_utf8_or_latin1(path)?),
        };
        if !list.rows.iter().any(|row| row.year().is_some()) {
            return Err(SorterError::InvalidMaster(format!(
                "A列に年の行がありません ({}行): {}",
                list.rows.len(),
                path.display()
            )));
        }
        Ok(list)
    }

    pub fn from_csv(content: &str) -> Self {
        let rows = parse_csv_records(content)
            .into_iter()
            .filter(|fields| !fields.is_empty())
            .map(|fields| MasterRow::from_fields(&fields))
            .collect();
        Self { rows }
    }

    fn load_workbook(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| SorterError::ExcelRead(format!("{}: {}", path.display(), e)))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| SorterError::ExcelRead(format!("シートがありません: {}", path.display())))?
            .map_err(|e| SorterError::ExcelRead(format!("{}: {}", path.display(), e)))?;

        let rows = range
            .rows()
            .map(|cells| cells.iter().take(3).map(cell_text).collect::<Vec<_>>())
            .filter(|fields| fields.iter().any(|f| !f.trim().is_empty()))
            .map(|fields| MasterRow::from_fields(&fields))
            .collect();
        Ok(Self { rows })
    }

    /// 主・副マスタのテキストに変換
    pub fn to_master_texts(&self, has_header: bool) -> MasterTexts {
        let mut primary = MasterWriter::default();
        let mut secondary = MasterWriter::default();
        let mut studies = 0;
        let mut headers = 0;

        let skip = usize::from(has_header);
        for row in self.rows.iter().skip(skip) {
            if row.is_blank() {
                continue;
            }
            match row.year() {
                Some(year) => {
                    let desc_c = if row.col_c.is_empty() { &row.col_b } else { &row.col_c };
                    let desc_b = if row.col_b.is_empty() { &row.col_c } else { &row.col_b };
                    if !desc_c.is_empty() {
                        primary.study(year, desc_c);
                    }
                    if !desc_b.is_empty() {
                        secondary.study(year, desc_b);
                    }
                    if !desc_c.is_empty() || !desc_b.is_empty() {
                        studies += 1;
                    }
                }
                None if !row.col_a.is_empty() => {
                    primary.header(&row.col_a);
                    secondary.header(&row.col_a);
                    headers += 1;
                }
                None => {
                    tracing::debug!("年も見出しもない行を無視: {:?}", row);
                }
            }
        }

        MasterTexts {
            primary: primary.text,
            secondary: secondary.text,
            studies,
            headers,
        }
    }

    /// (年, 公開表記) の対応表。年のない行と C列が空の行は除く
    pub fn year_mapping(&self) -> Vec<(String, String)> {
        self.rows
            .iter()
            .filter_map(|row| {
                let year = row.year()?;
                let text = clean_whitespace(&row.col_c);
                (!text.is_empty()).then(|| (year.to_string(), text))
            })
            .collect()
    }
}

/// 副マスタの既定の出力先 `<stem>_COLB<ext>`
pub fn default_secondary_path(out_c: &Path) -> PathBuf {
    let stem = out_c
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match out_c.extension() {
        Some(ext) => format!("{}_COLB.{}", stem, ext.to_string_lossy()),
        None => format!("{}_COLB", stem),
    };
    out_c.with_file_name(name)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // 年は数値セルで入っていることが多い
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// CSVをレコードに分ける
///
/// ダブルクォート内のカンマ・改行と `""` のエスケープに対応。
/// 空行は空のレコードになる。
pub fn parse_csv_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line_has_content = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => {
                in_quotes = true;
                line_has_content = true;
            }
            ',' => {
                fields.push(std::mem::take(&mut field));
                line_has_content = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                if line_has_content || !field.is_empty() {
                    fields.push(std::mem::take(&mut field));
                }
                records.push(std::mem::take(&mut fields));
                line_has_content = false;
            }
            _ => field.push(c),
        }
    }
    if line_has_content || !field.is_empty() {
        fields.push(field);
        records.push(fields);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_csv_records() {
        let records = parse_csv_records("a,\"b, c\",\"say \"\"hi\"\"\"\r\n\n2020,\"multi\nline\",x");
        assert_eq!(records[0], vec!["a", "b, c", "say \"hi\""]);
        assert!(records[1].is_empty());
        assert_eq!(records[2], vec!["2020", "multi\nline", "x"]);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_parse_csv_empty_fields() {
        let records = parse_csv_records(",,\n");
        assert_eq!(records, vec![vec!["", "", ""]]);
    }

    #[test]
    fn test_to_master_texts() {
        let csv = "Year,Red,Public\n\
Phase I,,\n\
Oncology,,\n\
2023,RED DrugX secret,DrugX: public\n\
2022,Only red,\n\
2021,,Only public\n\
Cardiology,,\n\
2020,,\n\
,,\n";
        let texts = MasterList::from_csv(csv).to_master_texts(true);
        assert_eq!(
            texts.primary,
            "Phase I\nOncology\n2023 DrugX: public\n2022 Only red\n2021 Only public\n\nCardiology\n"
        );
        assert_eq!(
            texts.secondary,
            "Phase I\nOncology\n2023 RED DrugX secret\n2022 Only red\n2021 Only public\n\nCardiology\n"
        );
        assert_eq!(texts.headers, 3);
        assert_eq!(texts.studies, 3);
    }

    #[test]
    fn test_header_row_not_skipped_without_flag() {
        let texts = MasterList::from_csv("Year,Red,Public\n2020,a,b\n").to_master_texts(false);
        assert_eq!(texts.primary, "Year\n2020 b\n");
    }

    #[test]
    fn test_converted_master_parses_into_same_shape() {
        use cv_sorter_common::taxonomy::Taxonomy;
        use cv_sorter_common::types::Phase;

        let csv = "Phase I,,\nOncology,,\n2023,r1,p1\n2022,r2,p2\nCardiology,,\n2021,r3,p3\nPhase II-IV,,\nVaccines,,\n2019,r4,p4\n";
        let texts = MasterList::from_csv(csv).to_master_texts(false);
        let primary = Taxonomy::parse(&texts.primary);
        let secondary = Taxonomy::parse(&texts.secondary);
        assert_eq!(primary.get(Phase::PhaseI, "Cardiology").map(|e| e.len()), Some(1));
        assert_eq!(primary.get(Phase::PhaseIIToIV, "Vaccines").map(|e| e.len()), Some(1));
        assert_eq!(primary.len(), 4);
        assert_eq!(secondary.len(), 4);
    }

    #[test]
    fn test_year_mapping() {
        let csv = "Year,Red,Public\nSponsor,,\n2021,red,\"  Public   text, here \"\n2020,red,\n99,x,y\n";
        let mapping = MasterList::from_csv(csv).year_mapping();
        assert_eq!(mapping, vec![("2021".to_string(), "Public text, here".to_string())]);
    }

    #[test]
    fn test_default_secondary_path() {
        assert_eq!(
            default_secondary_path(Path::new("out/master.txt")),
            PathBuf::from("out/master_COLB.txt")
        );
        assert_eq!(default_secondary_path(Path::new("master")), PathBuf::from("master_COLB"));
    }

    #[test]
    fn test_load_latin1_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.csv");
        std::fs::write(&path, b"Phase I,,\nCaf\xE9 Sponsor,,\n2020,a,b\n").unwrap();
        let texts = MasterList::load(&path).unwrap().to_master_texts(false);
        assert!(texts.primary.contains("Café Sponsor"));
    }

    #[test]
    fn test_load_without_year_rows_is_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.csv");
        std::fs::write(&path, "Year,Red,Public\nPhase I,,\nOncology,,\n").unwrap();
        let result = MasterList::load(&path);
        assert!(matches!(result, Err(SorterError::InvalidMaster(_))));

        let empty = dir.path().join("empty.csv");
        std::fs::write(&empty, "").unwrap();
        assert!(matches!(MasterList::load(&empty), Err(SorterError::InvalidMaster(_))));
    }

    #[test]
    fn test_load_missing() {
        let result = MasterList::load(Path::new("/nonexistent/list.csv"));
        assert!(matches!(result, Err(SorterError::FileNotFound(_))));
    }
}
