use crate::cli::{IndentType, StyleArgs};
use crate::error::{Result, SorterError};
use cv_sorter_common::render::{PlainTextOptions, RichTextOptions, Separator};
use cv_sorter_common::DEFAULT_END_MARKER;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 研究歴セクションの既定の見出し
pub const DEFAULT_SECTION_START: &str = "Research Experience";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 分類の閾値
    pub threshold: f64,
    /// 年なし行補完の閾値
    pub resolve_threshold: f64,
    pub indent_type: IndentType,
    pub indent_size: usize,
    pub bold: bool,
    pub text_bold_markers: bool,
    /// リッチテキストのぶら下げインデント（インチ）
    pub docx_indent: f64,
    pub section_start: String,
    pub section_end: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: 0.80,
            resolve_threshold: 0.88,
            indent_type: IndentType::Tab,
            indent_size: 1,
            bold: true,
            text_bold_markers: false,
            docx_indent: 0.5,
            section_start: DEFAULT_SECTION_START.into(),
            section_end: DEFAULT_END_MARKER.into(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| SorterError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("cv-sorter").join("config.json"))
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("threshold", self.threshold), ("resolve_threshold", self.resolve_threshold)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SorterError::Config(format!(
                    "{} は 0.0〜1.0 で指定してください: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        self.threshold = threshold;
        self.validate()?;
        self.save()
    }

    pub fn set_indent_size(&mut self, size: usize) -> Result<()> {
        self.indent_size = size;
        self.save()
    }

    /// CLI指定で上書きした出力スタイル
    pub fn with_style(&self, style: &StyleArgs) -> Self {
        Self {
            indent_type: style.indent_type.unwrap_or(self.indent_type),
            indent_size: style.indent_size.unwrap_or(self.indent_size),
            bold: style.bold.unwrap_or(self.bold),
            text_bold_markers: style.text_bold_markers.unwrap_or(self.text_bold_markers),
            docx_indent: style.docx_indent.unwrap_or(self.docx_indent),
            ..self.clone()
        }
    }

    pub fn separator(&self) -> Separator {
        match self.indent_type {
            IndentType::Tab => Separator::Tab,
            IndentType::Spaces => Separator::Spaces(self.indent_size),
        }
    }

    pub fn plain_text_options(&self) -> PlainTextOptions {
        PlainTextOptions {
            separator: self.separator(),
            bold: self.bold,
            bold_markers: self.text_bold_markers,
        }
    }

    pub fn rich_text_options(&self) -> RichTextOptions {
        RichTextOptions {
            bold: self.bold,
            hanging_indent_inches: self.docx_indent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.threshold, 0.80);
        assert_eq!(config.resolve_threshold, 0.88);
    }

    #[test]
    fn test_save_and_load_partial() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config { indent_size: 4, ..Default::default() };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().indent_size, 4);

        // 欠けた項目は既定値
        std::fs::write(&path, r#"{"bold": false}"#).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert!(!loaded.bold);
        assert_eq!(loaded.threshold, 0.80);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"threshold": 1.5}"#).unwrap();
        assert!(matches!(Config::load_from(&path), Err(SorterError::Config(_))));
    }

    #[test]
    fn test_with_style_overrides() {
        let style = StyleArgs {
            indent_type: Some(IndentType::Tab),
            bold: Some(false),
            ..Default::default()
        };
        let config = Config::default().with_style(&style);
        assert_eq!(config.separator(), Separator::Tab);
        assert!(!config.plain_text_options().bold);
        assert_eq!(config.rich_text_options().hanging_indent_inches, 0.5);
    }
}
