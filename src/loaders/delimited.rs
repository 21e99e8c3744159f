use super::{dedupe_headers, TableLoader};
use crate::error::{MetadataError, Result};
use crate::table::{Table, Value};
use csv::ReaderBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Reads a delimited text file with a header row into a [`Table`].
#[derive(Debug, Clone)]
pub struct DelimitedLoader {
    path: PathBuf,
    delimiter: u8,
    skip_rows: usize,
    header_strip: Vec<char>,
}

impl DelimitedLoader {
    pub fn csv(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
            skip_rows: 0,
            header_strip: Vec::new(),
        }
    }

    pub fn tsv(path: impl AsRef<Path>) -> Self {
        Self {
            delimiter: b'\t',
            ..Self::csv(path)
        }
    }

    /// Number of physical lines to drop before the header row.
    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    /// Characters trimmed from both ends of every column name.
    pub fn with_header_strip(mut self, chars: &str) -> Self {
        self.header_strip = chars.chars().collect();
        self
    }

    fn parse(&self, content: &str) -> Result<Table> {
        let body: String = content
            .lines()
            .skip(self.skip_rows)
            .collect::<Vec<_>>()
            .join("\n");

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(body.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_matches(|c| self.header_strip.contains(&c)).to_string())
            .collect();

        let mut table = Table::new(dedupe_headers(headers));
        for record in reader.records() {
            let record = record?;
            table.push_row(
                record
                    .iter()
                    .map(|field| Value::from_field(field, &[]))
                    .collect(),
            );
        }
        table.infer_types();
        Ok(table)
    }
}

impl TableLoader for DelimitedLoader {
    fn source_name(&self) -> String {
        self.path.display().to_string()
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Table> {
        let content =
            fs::read_to_string(&self.path).map_err(|e| MetadataError::io(&self.path, e))?;
        let table = self.parse(&content)?;
        debug!(
            "Read {} rows with columns {:?}",
            table.len(),
            table.columns()
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HMD: &str = "!! Bach chorales index\n!! generated\n* sort\t* title-id\t* description\n1\tchor001\t<link>Aus meines Herzens Grunde</link>, <small>BWV 269</small> (G)\n2\tchor002\t<link>Ich dank dir, lieber Herre</link>, <small>BWV 347</small> (D)\n*-\t*-\t*-\n";

    #[test]
    fn test_tsv_skips_rows_and_strips_headers() {
        let loader = DelimitedLoader::tsv("index.hmd")
            .with_skip_rows(2)
            .with_header_strip("* ");
        let table = loader.parse(HMD).unwrap();
        assert_eq!(table.columns(), &["sort", "title-id", "description"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0][1], Value::Text("chor001".to_string()));
        // the terminator row keeps the sort column textual
        assert_eq!(table.rows()[0][0], Value::Text("1".to_string()));
    }

    #[test]
    fn test_csv_empty_fields_are_missing() {
        let loader = DelimitedLoader::csv("wiki.csv");
        let table = loader
            .parse("389,Riemenschneider,Title\n1,1,Aus meines Herzens Grunde\n2,,Herr Gott\n")
            .unwrap();
        assert_eq!(table.rows()[1][1], Value::Missing);
        assert_eq!(table.rows()[0][0], Value::Int(1));
    }

    #[test]
    fn test_duplicate_csv_headers_are_made_unique() {
        let table = DelimitedLoader::csv("wiki.csv")
            .parse("389,Riemenschneider,Title,Title\n1,1,Aus meines,Aus meines Herzens\n")
            .unwrap();
        assert_eq!(table.columns(), &["389", "Riemenschneider", "Title", "Title.1"]);
        assert_eq!(table.rows()[0][3], Value::Text("Aus meines Herzens".to_string()));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let loader = DelimitedLoader::csv("/nonexistent/389_chorale_settings.csv");
        assert!(matches!(loader.load(), Err(MetadataError::Io { .. })));
    }
}
