//! In-memory tabular model shared by every pipeline stage.
//!
//! A [`Table`] is a list of column names plus row-major [`Value`] cells.
//! [`IndexedTable`] adds a unique integer index, and [`Series`] is one
//! indexed column used for index-aligned concatenation.

use crate::error::{MetadataError, Result};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Build a cell from a raw source field. Empty fields and configured
    /// placeholder tokens become [`Value::Missing`].
    pub fn from_field(raw: &str, na_values: &[String]) -> Value {
        if raw.is_empty() || na_values.iter().any(|na| na == raw) {
            Value::Missing
        } else {
            Value::Text(raw.to_string())
        }
    }

    pub fn from_opt_int(value: Option<i64>) -> Value {
        value.map(Value::Int).unwrap_or(Value::Missing)
    }

    pub fn from_opt_string(value: Option<String>) -> Value {
        value.map(Value::Text).unwrap_or(Value::Missing)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Serialized form used in CSV output. Missing cells are empty.
    pub fn to_field(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{:.1}", f),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_field())
    }
}

/// Inferred storage type of a column, named the way the dtype side file
/// reports it. A column with no present values is `object`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    NullableInt64,
    Float64,
    Object,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int64 => "int64",
            ColumnType::NullableInt64 => "Int64",
            ColumnType::Float64 => "float64",
            ColumnType::Object => "object",
        }
    }

    fn of(values: &[&Value]) -> ColumnType {
        let present: Vec<&&Value> = values.iter().filter(|v| !v.is_missing()).collect();
        if present.is_empty() {
            return ColumnType::Object;
        }
        let has_missing = present.len() < values.len();
        if present.iter().all(|v| matches!(v, Value::Int(_))) {
            if has_missing {
                ColumnType::NullableInt64
            } else {
                ColumnType::Int64
            }
        } else if present
            .iter()
            .all(|v| matches!(v, Value::Int(_) | Value::Float(_)))
        {
            ColumnType::Float64
        } else {
            ColumnType::Object
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

fn parse_float(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if !trimmed.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with missing cells and dropping
    /// cells beyond the column count.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Missing);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_position(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| MetadataError::MissingColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let pos = self.column_position(name)?;
        Ok(self.rows.iter().map(|row| &row[pos]).collect())
    }

    pub fn column_values(&self, name: &str) -> Result<Vec<Value>> {
        Ok(self.column(name)?.into_iter().cloned().collect())
    }

    /// Insert a column at `position`. `values` must hold one cell per row.
    pub fn insert_column(&mut self, position: usize, name: &str, values: Vec<Value>) {
        assert_eq!(
            values.len(),
            self.rows.len(),
            "column '{}' length does not match table",
            name
        );
        let position = position.min(self.columns.len());
        self.columns.insert(position, name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(position, value);
        }
    }

    pub fn push_column(&mut self, name: &str, values: Vec<Value>) {
        let end = self.columns.len();
        self.insert_column(end, name, values);
    }

    pub fn drop_column(&mut self, name: &str) -> Result<Vec<Value>> {
        let pos = self.column_position(name)?;
        self.columns.remove(pos);
        Ok(self.rows.iter_mut().map(|row| row.remove(pos)).collect())
    }

    pub fn drop_last_row(&mut self) -> Option<Vec<Value>> {
        self.rows.pop()
    }

    /// Keep the rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Value]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// Stable ascending sort on an integer column; missing values sort last.
    pub fn sort_by_int_column(&mut self, name: &str) -> Result<()> {
        let pos = self.column_position(name)?;
        if let Some(bad) = self.rows.iter().find_map(|row| match &row[pos] {
            Value::Missing | Value::Int(_) => None,
            other => Some(other.to_field()),
        }) {
            return Err(MetadataError::parse(name, bad));
        }
        self.rows
            .sort_by(|a, b| cmp_missing_last(a[pos].as_int(), b[pos].as_int()));
        Ok(())
    }

    /// Convert text columns to ints or floats when every present cell parses.
    pub fn infer_types(&mut self) {
        for pos in 0..self.columns.len() {
            let texts: Vec<&str> = self
                .rows
                .iter()
                .filter_map(|row| row[pos].as_text())
                .collect();
            if texts.is_empty() {
                continue;
            }
            if texts.iter().all(|t| parse_int(t).is_some()) {
                for row in self.rows.iter_mut() {
                    if let Value::Text(t) = &row[pos] {
                        row[pos] = parse_int(t).map(Value::Int).unwrap_or(Value::Missing);
                    }
                }
            } else if texts.iter().all(|t| parse_float(t).is_some()) {
                for row in self.rows.iter_mut() {
                    if let Value::Text(t) = &row[pos] {
                        row[pos] = parse_float(t).map(Value::Float).unwrap_or(Value::Missing);
                    }
                }
            }
        }
    }

    /// Force a column to nullable integers. Integral floats are accepted;
    /// anything else is a parse error.
    pub fn coerce_nullable_int(&mut self, name: &str) -> Result<()> {
        let pos = self.column_position(name)?;
        for row in self.rows.iter_mut() {
            let coerced = match &row[pos] {
                Value::Missing => Value::Missing,
                Value::Int(i) => Value::Int(*i),
                Value::Float(f) if f.fract() == 0.0 => Value::Int(*f as i64),
                Value::Text(t) => match parse_int(t) {
                    Some(i) => Value::Int(i),
                    None => return Err(MetadataError::parse(name, t.clone())),
                },
                other => return Err(MetadataError::parse(name, other.to_field())),
            };
            row[pos] = coerced;
        }
        Ok(())
    }

    pub fn dtypes(&self) -> Vec<(String, ColumnType)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(pos, name)| {
                let values: Vec<&Value> = self.rows.iter().map(|row| &row[pos]).collect();
                (name.clone(), ColumnType::of(&values))
            })
            .collect()
    }
}

pub(crate) fn cmp_missing_last(a: Option<i64>, b: Option<i64>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// One named column keyed by an integer index.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub index: Vec<i64>,
    pub values: Vec<Value>,
}

impl Series {
    pub fn new(name: &str, index: Vec<i64>, values: Vec<Value>) -> Self {
        assert_eq!(index.len(), values.len(), "series '{}' is ragged", name);
        Self {
            name: name.to_string(),
            index,
            values,
        }
    }

    /// Build a series by evaluating `f` on every index value.
    pub fn from_index<F>(name: &str, index: &[i64], f: F) -> Self
    where
        F: Fn(i64) -> Value,
    {
        Self::new(name, index.to_vec(), index.iter().map(|&i| f(i)).collect())
    }
}

/// A table with a unique integer index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedTable {
    index_name: String,
    index: Vec<i64>,
    table: Table,
}

impl IndexedTable {
    /// Attach `keys` as the index. Keys must be present and unique.
    pub fn new(index_name: &str, keys: Vec<Option<i64>>, table: Table) -> Result<Self> {
        assert_eq!(keys.len(), table.len(), "index length does not match table");
        let mut seen = BTreeSet::new();
        let mut index = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.ok_or_else(|| MetadataError::parse(index_name, ""))?;
            if !seen.insert(key) {
                return Err(MetadataError::DuplicateIndex {
                    index: index_name.to_string(),
                    value: key,
                });
            }
            index.push(key);
        }
        Ok(Self {
            index_name: index_name.to_string(),
            index,
            table,
        })
    }

    pub fn index(&self) -> &[i64] {
        &self.index
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn sort_index(&mut self) {
        let mut order: Vec<usize> = (0..self.index.len()).collect();
        order.sort_by_key(|&i| self.index[i]);
        self.index = order.iter().map(|&i| self.index[i]).collect();
        self.table.rows = order.iter().map(|&i| self.table.rows[i].clone()).collect();
    }

    /// The table with the index prepended as an ordinary column.
    pub fn to_table_with_index(&self) -> Table {
        let mut table = self.table.clone();
        let keys = self.index.iter().map(|&i| Value::Int(i)).collect();
        table.insert_column(0, &self.index_name, keys);
        table
    }

    /// Prepend `series` column-wise onto `base`, aligned on the index.
    ///
    /// Every series must cover exactly the index domain of `base`; any
    /// missing or extra key is an [`MetadataError::IndexMismatch`].
    pub fn concat_aligned(series: Vec<Series>, base: IndexedTable) -> Result<IndexedTable> {
        let domain: BTreeSet<i64> = base.index.iter().copied().collect();
        let mut out = base;
        for (offset, s) in series.into_iter().enumerate() {
            let mut by_key: HashMap<i64, Value> = HashMap::with_capacity(s.index.len());
            let mut unexpected = Vec::new();
            for (key, value) in s.index.iter().zip(s.values) {
                if !domain.contains(key) || by_key.insert(*key, value).is_some() {
                    unexpected.push(*key);
                }
            }
            let missing: Vec<i64> = out
                .index
                .iter()
                .filter(|k| !by_key.contains_key(k))
                .copied()
                .collect();
            if !missing.is_empty() || !unexpected.is_empty() {
                return Err(MetadataError::IndexMismatch {
                    column: s.name,
                    index: out.index_name.clone(),
                    missing,
                    unexpected,
                });
            }
            let aligned = out
                .index
                .iter()
                .map(|k| by_key.remove(k).unwrap_or(Value::Missing))
                .collect();
            out.table.insert_column(offset, &s.name, aligned);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn sample() -> Table {
        let mut t = Table::new(vec!["a".into(), "b".into()]);
        t.push_row(vec![text("3"), text("x")]);
        t.push_row(vec![Value::Missing, text("y")]);
        t.push_row(vec![text("1"), text("z")]);
        t
    }

    #[test]
    fn test_from_field_placeholders() {
        let na = vec!["9999".to_string(), "ZZZZ".to_string()];
        assert_eq!(Value::from_field("9999", &na), Value::Missing);
        assert_eq!(Value::from_field("ZZZZ", &na), Value::Missing);
        assert_eq!(Value::from_field("", &na), Value::Missing);
        assert_eq!(Value::from_field("12", &na), text("12"));
    }

    #[test]
    fn test_infer_types_and_dtypes() {
        let mut t = sample();
        t.push_column("c", vec![text("1.5"), text("2"), Value::Missing]);
        t.push_column("d", vec![Value::Missing, Value::Missing, Value::Missing]);
        t.infer_types();
        assert_eq!(t.rows()[0][0], Value::Int(3));
        assert_eq!(t.rows()[1][2], Value::Float(2.0));
        let dtypes: Vec<&str> = t.dtypes().iter().map(|(_, d)| d.as_str()).collect();
        assert_eq!(dtypes, vec!["Int64", "object", "float64", "object"]);
    }

    #[test]
    fn test_float_field_format() {
        assert_eq!(Value::Float(12.0).to_field(), "12.0");
        assert_eq!(Value::Float(0.25).to_field(), "0.25");
        assert_eq!(Value::Missing.to_field(), "");
    }

    #[test]
    fn test_sort_missing_last_is_stable() {
        let mut t = sample();
        t.push_row(vec![text("1"), text("w")]);
        t.infer_types();
        t.sort_by_int_column("a").unwrap();
        let b: Vec<String> = t.column("b").unwrap().iter().map(|v| v.to_field()).collect();
        assert_eq!(b, vec!["z", "w", "x", "y"]);
    }

    #[test]
    fn test_sort_rejects_text() {
        let mut t = sample();
        assert!(matches!(
            t.sort_by_int_column("b"),
            Err(MetadataError::Parse { .. })
        ));
    }

    #[test]
    fn test_coerce_nullable_int() {
        let mut t = sample();
        t.coerce_nullable_int("a").unwrap();
        assert_eq!(t.rows()[1][0], Value::Missing);
        assert_eq!(t.rows()[2][0], Value::Int(1));
        assert!(t.coerce_nullable_int("b").is_err());
    }

    #[test]
    fn test_missing_column() {
        let t = sample();
        assert!(matches!(
            t.column("nope"),
            Err(MetadataError::MissingColumn(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let t = sample();
        let err = IndexedTable::new("R", vec![Some(1), Some(2), Some(1)], t).unwrap_err();
        assert!(matches!(err, MetadataError::DuplicateIndex { value: 1, .. }));
    }

    #[test]
    fn test_concat_aligned_reorders_by_key() {
        let t = sample();
        let base = IndexedTable::new("R", vec![Some(10), Some(20), Some(30)], t).unwrap();
        let s = Series::new("k", vec![30, 10, 20], vec![text("c"), text("a"), text("b")]);
        let out = IndexedTable::concat_aligned(vec![s], base).unwrap();
        assert_eq!(out.table().columns()[0], "k");
        let k: Vec<String> = out.table().column("k").unwrap().iter().map(|v| v.to_field()).collect();
        assert_eq!(k, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_concat_aligned_rejects_domain_mismatch() {
        let t = sample();
        let base = IndexedTable::new("R", vec![Some(1), Some(2), Some(3)], t).unwrap();
        let s = Series::new("k", vec![1, 2, 4], vec![text("a"), text("b"), text("d")]);
        match IndexedTable::concat_aligned(vec![s], base) {
            Err(MetadataError::IndexMismatch {
                missing, unexpected, ..
            }) => {
                assert_eq!(missing, vec![3]);
                assert_eq!(unexpected, vec![4]);
            }
            other => panic!("expected IndexMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_sort_index_and_prepend() {
        let t = sample();
        let mut it = IndexedTable::new("R", vec![Some(3), Some(1), Some(2)], t).unwrap();
        it.sort_index();
        assert_eq!(it.index(), &[1, 2, 3]);
        let flat = it.to_table_with_index();
        assert_eq!(flat.columns()[0], "R");
        assert_eq!(flat.rows()[0][2], text("y"));
    }
}
