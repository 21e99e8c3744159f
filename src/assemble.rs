//! Stages 2 and 3: turn loaded source tables into the output tables.

use crate::config::CorpusConfig;
use crate::constants::{
    krn_file_name, xml_file_name, BCT_B, BCT_BWV, BCT_R, BWV, CAP_FILE, CATALOG_389, CPE,
    CPE_POSITION, KRN_DESCRIPTION, KRN_FILE, KRN_SORT, KRN_TITLE, RIEMENSCHNEIDER, WIKI_SUFFIX,
    XML_FILE,
};
use crate::error::{MetadataError, Result};
use crate::join::outer_join;
use crate::loaders::CapListing;
use crate::normalize::{make_bwv_column, make_integer_column, parse_description};
use crate::table::{IndexedTable, Series, Table, Value};
use std::collections::HashMap;
use tracing::{debug, info};

/// Split the humdrum index descriptions into `bwv`, `title`, `bwv1`, `bwv2`
/// and `mode` columns, drop the trailing terminator row and index the
/// result by the `sort` column.
pub fn build_krn_metadata(mut krn_table: Table) -> Result<IndexedTable> {
    let fields: Vec<_> = krn_table
        .drop_column(KRN_DESCRIPTION)?
        .iter()
        .map(|cell| parse_description(&cell.to_field()))
        .collect();

    let unmatched = fields.iter().filter(|f| f.title.is_none()).count();
    debug!("{} descriptions without a <link> title", unmatched);

    krn_table.push_column(
        BWV,
        fields.iter().map(|f| Value::from_opt_string(f.bwv())).collect(),
    );
    krn_table.push_column(
        "title",
        fields.iter().map(|f| Value::from_opt_string(f.title.clone())).collect(),
    );
    krn_table.push_column(
        "bwv1",
        fields.iter().map(|f| Value::from_opt_string(f.bwv1.clone())).collect(),
    );
    krn_table.push_column(
        "bwv2",
        fields.iter().map(|f| Value::from_opt_string(f.bwv2.clone())).collect(),
    );
    krn_table.push_column(
        "mode",
        fields.iter().map(|f| Value::from_opt_string(f.mode.clone())).collect(),
    );
    krn_table.drop_last_row();

    let keys = make_integer_column(KRN_SORT, &krn_table.column_values(KRN_SORT)?)?;
    IndexedTable::new(RIEMENSCHNEIDER, keys, krn_table)
}

/// Coerce the wiki catalog's key columns to nullable integers.
pub fn prepare_wiki(mut wiki: Table) -> Result<Table> {
    wiki.coerce_nullable_int(CATALOG_389)?;
    wiki.coerce_nullable_int(RIEMENSCHNEIDER)?;
    Ok(wiki)
}

/// Keep the BCT rows that carry a Riemenschneider number, index them by it
/// and add the CPE number derived from column `B`.
pub fn build_reference(mut bct: Table) -> Result<IndexedTable> {
    let r_pos = bct.column_position(BCT_R)?;
    let before = bct.len();
    bct.retain_rows(|row| !row[r_pos].is_missing());
    debug!("Dropped {} BCT rows without {}", before - bct.len(), BCT_R);

    let keys = make_integer_column(BCT_R, &bct.column_values(BCT_R)?)?;
    let cpe = make_integer_column(BCT_B, &bct.column_values(BCT_B)?)?;
    bct.insert_column(
        CPE_POSITION,
        CPE,
        cpe.into_iter().map(Value::from_opt_int).collect(),
    );

    let mut reference = IndexedTable::new(RIEMENSCHNEIDER, keys, bct)?;
    reference.sort_index();
    info!("Reference catalog has {} chorales", reference.index().len());
    Ok(reference)
}

/// Outer join of the reference catalog and the wiki catalog, ordered by the
/// 389 number.
pub fn build_mapping_table(reference: &IndexedTable, wiki: &Table) -> Result<Table> {
    let left = reference.to_table_with_index();
    let mut mapping = outer_join(&left, wiki, RIEMENSCHNEIDER, WIKI_SUFFIX)?;
    mapping.sort_by_int_column(CATALOG_389)?;
    Ok(mapping)
}

/// Humdrum titles over the whole corpus numbering.
///
/// Only the numbers the corpus lists as having no humdrum file may be
/// absent; any other gap, or a humdrum number outside the corpus, is an
/// error.
fn krn_title_series(corpus: &CorpusConfig, krn: &IndexedTable) -> Result<Series> {
    let titles: HashMap<i64, Value> = krn
        .index()
        .iter()
        .copied()
        .zip(krn.table().column_values("title")?)
        .collect();

    let numbers = corpus.numbers();
    let mut missing = Vec::new();
    let values = numbers
        .iter()
        .map(|&i| match titles.get(&i) {
            Some(title) if corpus.has_krn(i) => title.clone(),
            Some(_) => {
                debug!("Ignoring humdrum title for {}, listed as absent", i);
                Value::Missing
            }
            None => {
                if corpus.has_krn(i) {
                    missing.push(i);
                }
                Value::Missing
            }
        })
        .collect();
    let unexpected: Vec<i64> = krn
        .index()
        .iter()
        .filter(|&&i| i < 1 || i > corpus.size)
        .copied()
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(MetadataError::IndexMismatch {
            column: KRN_TITLE.to_string(),
            index: RIEMENSCHNEIDER.to_string(),
            missing,
            unexpected,
        });
    }
    Ok(Series::new(KRN_TITLE, numbers, values))
}

/// Prepend humdrum title, the three dataset filenames and the cleaned BWV
/// onto the reference table.
///
/// The title and filename columns are generated over `1..=corpus.size`, so a
/// reference catalog that lacks a number, or has one outside the corpus, is
/// rejected by the aligned concat.
pub fn build_riemenschneider(
    reference: IndexedTable,
    krn: &IndexedTable,
    caps: &CapListing,
    corpus: &CorpusConfig,
) -> Result<IndexedTable> {
    let numbers = corpus.numbers();
    let bwv = make_bwv_column(&reference.table().column_values(BCT_BWV)?)?;

    let series = vec![
        krn_title_series(corpus, krn)?,
        Series::from_index(KRN_FILE, &numbers, |i| {
            if corpus.has_krn(i) {
                Value::Text(krn_file_name(i))
            } else {
                Value::Missing
            }
        }),
        Series::from_index(XML_FILE, &numbers, |i| Value::Text(xml_file_name(i))),
        Series::from_index(CAP_FILE, &numbers, |i| {
            Value::from_opt_string(caps.get(i).map(|c| c.file_name.clone()))
        }),
        Series::new(BWV, reference.index().to_vec(), bwv),
    ];
    IndexedTable::concat_aligned(series, reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::CapFile;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row);
        }
        t
    }

    fn bct() -> Table {
        table(
            &["R", "B", "BWV", "Title"],
            vec![
                vec![text("3"), Value::Int(3), text("(153.01)"), text("Ach Gott")],
                vec![text("1"), Value::Int(1), text("(269)"), text("Aus meines")],
                vec![Value::Missing, Value::Int(9), text("(1)"), text("Extra")],
                vec![text("4"), Value::Missing, text("(145a)"), text("Nun lob")],
                vec![text("2=5"), Value::Int(2), text(""), text("Ich dank")],
            ],
        )
    }

    fn krn() -> IndexedTable {
        let raw = table(
            &["sort", "id", "description"],
            vec![
                vec![text("1"), text("chor001"), text("<link>Aus meines Herzens Grunde</link>, <small>BWV 269</small> (G)")],
                vec![text("2"), text("chor002"), text("<link>Ich dank dir</link>")],
                vec![text("3"), text("chor003"), text("<link>Ach Gott</link>, <small>BWV 153/1</small> (a)")],
                vec![text("*-"), text("*-"), text("*-")],
            ],
        );
        build_krn_metadata(raw).unwrap()
    }

    fn corpus(size: i64, krn_missing: &[i64]) -> CorpusConfig {
        CorpusConfig {
            size,
            krn_missing: krn_missing.to_vec(),
        }
    }

    #[test]
    fn test_build_krn_metadata_columns_and_index() {
        let krn = krn();
        assert_eq!(
            krn.table().columns(),
            &["sort", "id", "bwv", "title", "bwv1", "bwv2", "mode"]
        );
        assert_eq!(krn.index(), &[1, 2, 3]);
        let bwv: Vec<String> = krn.table().column("bwv").unwrap().iter().map(|v| v.to_field()).collect();
        assert_eq!(bwv, vec!["269", "", "153.1"]);
    }

    #[test]
    fn test_build_reference_filters_sorts_and_inserts_cpe() {
        let reference = build_reference(bct()).unwrap();
        assert_eq!(reference.index(), &[1, 2, 3, 4]);
        assert_eq!(reference.table().columns(), &["R", "B", "BWV", "CPE", "Title"]);
        let cpe: Vec<Option<i64>> = reference
            .table()
            .column("CPE")
            .unwrap()
            .iter()
            .map(|v| v.as_int())
            .collect();
        assert_eq!(cpe, vec![Some(1), Some(2), Some(3), None]);
    }

    #[test]
    fn test_build_reference_rejects_duplicates() {
        let mut dup = bct();
        dup.push_row(vec![text("1.2"), Value::Int(7), text(""), text("Dup")]);
        assert!(matches!(
            build_reference(dup),
            Err(MetadataError::DuplicateIndex { value: 1, .. })
        ));
    }

    #[test]
    fn test_build_riemenschneider() {
        let reference = build_reference(bct()).unwrap();
        let caps: CapListing = vec![CapFile {
            number: 1,
            file_name: "001 Aus meines Herzens Grunde.mscx".to_string(),
            title: "Aus meines Herzens Grunde".to_string(),
        }]
        .into_iter()
        .collect();
        let out = build_riemenschneider(reference, &krn(), &caps, &corpus(4, &[4])).unwrap();
        assert_eq!(
            &out.table().columns()[..6],
            &["krn_title", "krn_file", "xml_file", "cap_file", "bwv", "R"]
        );
        let row4 = &out.table().rows()[3];
        assert!(row4[0].is_missing());
        assert!(row4[1].is_missing());
        assert_eq!(row4[2], text("004/short_score.mxl"));
        assert!(row4[3].is_missing());
        assert_eq!(row4[4], text("145-a"));

        let row1 = &out.table().rows()[0];
        assert_eq!(row1[0], text("Aus meines Herzens Grunde"));
        assert_eq!(row1[1], text("chor001.krn"));
        assert_eq!(row1[3], text("001 Aus meines Herzens Grunde.mscx"));
        assert_eq!(out.table().rows()[2][4], text("153.1"));
        assert!(out.table().rows()[1][4].is_missing());
    }

    #[test]
    fn test_unexplained_krn_gap_is_rejected() {
        let mut raw_bct = bct();
        raw_bct.push_row(vec![text("5"), Value::Int(5), text("(5)"), text("Five")]);
        let reference = build_reference(raw_bct).unwrap();
        let err = build_riemenschneider(reference, &krn(), &CapListing::default(), &corpus(5, &[4]))
            .unwrap_err();
        match err {
            MetadataError::IndexMismatch { column, missing, .. } => {
                assert_eq!(column, "krn_title");
                assert_eq!(missing, vec![5]);
            }
            other => panic!("expected IndexMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_short_reference_is_rejected() {
        let mut raw_bct = bct();
        raw_bct.retain_rows(|row| row[0] != text("2=5"));
        let reference = build_reference(raw_bct).unwrap();
        assert_eq!(reference.index(), &[1, 3, 4]);
        let err = build_riemenschneider(reference, &krn(), &CapListing::default(), &corpus(4, &[4]))
            .unwrap_err();
        match err {
            MetadataError::IndexMismatch { column, missing, unexpected, .. } => {
                assert_eq!(column, "krn_title");
                assert!(missing.is_empty());
                assert_eq!(unexpected, vec![2]);
            }
            other => panic!("expected IndexMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_outside_corpus_is_rejected() {
        let mut raw_bct = bct();
        raw_bct.push_row(vec![text("9"), Value::Int(9), text("(9)"), text("Nine")]);
        let reference = build_reference(raw_bct).unwrap();
        let err = build_riemenschneider(reference, &krn(), &CapListing::default(), &corpus(4, &[4]))
            .unwrap_err();
        assert!(matches!(
            err,
            MetadataError::IndexMismatch { ref missing, .. } if missing == &vec![9]
        ));
    }

    #[test]
    fn test_build_mapping_table_sorted_by_389() {
        let reference = build_reference(bct()).unwrap();
        let wiki = prepare_wiki(table(
            &["389", "Riemenschneider", "Title"],
            vec![
                vec![text("2"), text("3"), text("ach")],
                vec![text("1"), text("1"), text("aus")],
                vec![text("3"), Value::Missing, text("extra")],
            ],
        ))
        .unwrap();
        let mapping = build_mapping_table(&reference, &wiki).unwrap();
        let keys: Vec<Option<i64>> = mapping
            .column("Riemenschneider")
            .unwrap()
            .iter()
            .map(|v| v.as_int())
            .collect();
        assert_eq!(keys, vec![Some(1), Some(3), None, Some(2), Some(4)]);
        assert!(mapping.has_column("Title_wiki"));
    }

    #[test]
    fn test_prepare_wiki_rejects_non_integer() {
        let wiki = table(&["389", "Riemenschneider"], vec![vec![text("1"), text("x")]]);
        assert!(prepare_wiki(wiki).is_err());
    }
}
