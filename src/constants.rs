//! Source, column and output name constants so every stage refers to the
//! catalogs the same way.

/// Number of chorales in the Riemenschneider collection.
pub const CORPUS_SIZE: i64 = 371;

/// Riemenschneider numbers with no humdrum file in the craigsapp dataset.
pub const KRN_MISSING_INDICES: &[i64] = &[150];

// Default source locations, relative to the base directory
pub const BCT_HTML_SOURCE: &str = "BCT_html_source";
pub const BCT_URL: &str = "http://www.bach-chorales.com/BachChoraleTable.htm";
pub const KRN_INDEX: &str = "../craigsapp_krn/index.hmd";
pub const CAP_DIR: &str = "../DCMLab_cap/MS3";
pub const CAP_EXTENSION: &str = ".mscx";
pub const WIKI_CSV: &str = "389_chorale_settings.csv";

pub const LOG_DIR: &str = "logs";

// Default outputs
pub const KRN_METADATA_CSV: &str = "krn_metadata.csv";
pub const KRN_METADATA_DTYPES_CSV: &str = "krn_metadata_dtypes.csv";
pub const MAPPING_TABLE_CSV: &str = "mapping_table.csv";
pub const RIEMENSCHNEIDER_CSV: &str = "riemenschneider.csv";

// HTML table options
pub const DEFAULT_TABLE_ID: &str = "sortable";
pub const DEFAULT_NA_VALUES: &[&str] = &["9999", "ZZZZ"];

// Humdrum index options
pub const KRN_SKIP_ROWS: usize = 2;
pub const KRN_HEADER_STRIP: &str = "* ";

// Column names
pub const RIEMENSCHNEIDER: &str = "Riemenschneider";
pub const CATALOG_389: &str = "389";
pub const CPE: &str = "CPE";
pub const BCT_R: &str = "R";
pub const BCT_B: &str = "B";
pub const BCT_BWV: &str = "BWV";
pub const KRN_SORT: &str = "sort";
pub const KRN_DESCRIPTION: &str = "description";
pub const KRN_TITLE: &str = "krn_title";
pub const KRN_FILE: &str = "krn_file";
pub const XML_FILE: &str = "xml_file";
pub const CAP_FILE: &str = "cap_file";
pub const BWV: &str = "bwv";

/// Column position of the CPE number inside the reference table.
pub const CPE_POSITION: usize = 3;

/// Suffix for wiki columns whose names collide with reference columns.
pub const WIKI_SUFFIX: &str = "_wiki";

/// Humdrum file name for a Riemenschneider number.
pub fn krn_file_name(index: i64) -> String {
    format!("chor{:03}.krn", index)
}

/// MusicXML short score path for a Riemenschneider number.
pub fn xml_file_name(index: i64) -> String {
    format!("{:03}/short_score.mxl", index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_krn_file_name() {
        assert_eq!(krn_file_name(1), "chor001.krn");
        assert_eq!(krn_file_name(149), "chor149.krn");
        assert_eq!(krn_file_name(371), "chor371.krn");
    }

    #[test]
    fn test_xml_file_name_covers_corpus() {
        for i in 1..=CORPUS_SIZE {
            assert_eq!(xml_file_name(i), format!("{:03}/short_score.mxl", i));
        }
        assert_eq!(xml_file_name(7), "007/short_score.mxl");
    }
}
