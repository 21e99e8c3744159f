use crate::constants;
use crate::error::{MetadataError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Locations and parsing options for one pipeline run.
///
/// Every field has a default, so an empty TOML file (or none at all) gives
/// the standard layout next to the sibling dataset checkouts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory every relative path is resolved against.
    pub base_dir: PathBuf,
    /// Rolling JSON log directory, relative to `base_dir`.
    pub log_dir: String,
    pub corpus: CorpusConfig,
    pub sources: SourcesConfig,
    pub outputs: OutputsConfig,
}

/// Numbering of the chorale collection the filename columns are built over.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Chorales are numbered `1..=size`.
    pub size: i64,
    /// Numbers with no humdrum file.
    pub krn_missing: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub bct_html: String,
    /// When set, the BCT table is fetched from here instead of `bct_html`.
    pub bct_url: Option<String>,
    pub table_id: String,
    /// Which of the tables matching `table_id` to read, counting from 0.
    pub table_index: usize,
    pub na_values: Vec<String>,
    pub krn_index: String,
    pub krn_skip_rows: usize,
    pub cap_dir: String,
    pub cap_extension: String,
    pub wiki_csv: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputsConfig {
    pub krn_metadata: String,
    pub krn_metadata_dtypes: String,
    pub mapping_table: String,
    pub riemenschneider: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            log_dir: constants::LOG_DIR.to_string(),
            corpus: CorpusConfig::default(),
            sources: SourcesConfig::default(),
            outputs: OutputsConfig::default(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            bct_html: constants::BCT_HTML_SOURCE.to_string(),
            bct_url: None,
            table_id: constants::DEFAULT_TABLE_ID.to_string(),
            table_index: 0,
            na_values: constants::DEFAULT_NA_VALUES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            krn_index: constants::KRN_INDEX.to_string(),
            krn_skip_rows: constants::KRN_SKIP_ROWS,
            cap_dir: constants::CAP_DIR.to_string(),
            cap_extension: constants::CAP_EXTENSION.to_string(),
            wiki_csv: constants::WIKI_CSV.to_string(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            size: constants::CORPUS_SIZE,
            krn_missing: constants::KRN_MISSING_INDICES.to_vec(),
        }
    }
}

impl CorpusConfig {
    pub fn numbers(&self) -> Vec<i64> {
        (1..=self.size).collect()
    }

    pub fn has_krn(&self, number: i64) -> bool {
        !self.krn_missing.contains(&number)
    }
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            krn_metadata: constants::KRN_METADATA_CSV.to_string(),
            krn_metadata_dtypes: constants::KRN_METADATA_DTYPES_CSV.to_string(),
            mapping_table: constants::MAPPING_TABLE_CSV.to_string(),
            riemenschneider: constants::RIEMENSCHNEIDER_CSV.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Defaults rooted at `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path).map_err(|e| {
            MetadataError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve `relative` against the base directory.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config.sources.krn_index, "../craigsapp_krn/index.hmd");
        assert_eq!(config.sources.na_values, vec!["9999", "ZZZZ"]);
        assert_eq!(config.sources.krn_skip_rows, 2);
        assert_eq!(config.outputs.mapping_table, "mapping_table.csv");
        assert_eq!(config.base_dir, PathBuf::from("."));
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.corpus.size, 371);
        assert_eq!(config.corpus.numbers().len(), 371);
        assert!(!config.corpus.has_krn(150));
        assert!(config.corpus.has_krn(149));
    }

    #[test]
    fn test_partial_override() {
        let config = PipelineConfig::from_toml_str(
            r#"
            base_dir = "/data/chorales"

            [corpus]
            size = 5
            krn_missing = []

            [sources]
            bct_url = "http://www.bach-chorales.com/BachChoraleTable.htm"
            cap_dir = "dcml/MS3"

            [outputs]
            riemenschneider = "out/riemenschneider.csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.sources.cap_dir, "dcml/MS3");
        assert_eq!(config.corpus.numbers(), vec![1, 2, 3, 4, 5]);
        assert!(config.corpus.has_krn(150));
        assert_eq!(config.sources.table_id, "sortable");
        assert!(config.sources.bct_url.is_some());
        assert_eq!(
            config.resolve(&config.outputs.riemenschneider),
            PathBuf::from("/data/chorales/out/riemenschneider.csv")
        );
    }

    #[test]
    fn test_malformed_toml_is_error() {
        assert!(matches!(
            PipelineConfig::from_toml_str("[sources\nbct_html = 1"),
            Err(MetadataError::Toml(_))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        assert!(matches!(
            PipelineConfig::load(Path::new("/nonexistent/chorale_meta.toml")),
            Err(MetadataError::Config(_))
        ));
    }
}
