//! Full outer join of two tables on an integer key column.

use crate::error::{MetadataError, Result};
use crate::table::{cmp_missing_last, Table, Value};
use std::collections::BTreeMap;
use tracing::debug;

fn key_of(pos: usize, row: &[Value], key: &str) -> Result<Option<i64>> {
    match &row[pos] {
        Value::Missing => Ok(None),
        Value::Int(i) => Ok(Some(*i)),
        other => Err(MetadataError::parse(key, other.to_field())),
    }
}

/// Join `left` and `right` on the integer column `key`, keeping every row
/// of both sides.
///
/// The output starts with `key`, followed by the other left columns and the
/// other right columns. Right columns whose name already exists on the left
/// get `right_suffix`. Left rows come first in key order, each followed by
/// its matches; right rows that matched nothing come last, also in key order
/// with missing keys at the end.
pub fn outer_join(left: &Table, right: &Table, key: &str, right_suffix: &str) -> Result<Table> {
    let left_key = left.column_position(key)?;
    let right_key = right.column_position(key)?;

    let left_cols: Vec<usize> = (0..left.columns().len()).filter(|&i| i != left_key).collect();
    let right_cols: Vec<usize> = (0..right.columns().len())
        .filter(|&i| i != right_key)
        .collect();

    let mut columns = vec![key.to_string()];
    columns.extend(left_cols.iter().map(|&i| left.columns()[i].clone()));
    for &i in &right_cols {
        let name = &right.columns()[i];
        if columns.contains(name) {
            columns.push(format!("{}{}", name, right_suffix));
        } else {
            columns.push(name.clone());
        }
    }

    let mut right_by_key: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    let mut right_keys = Vec::with_capacity(right.len());
    for (idx, row) in right.rows().iter().enumerate() {
        let k = key_of(right_key, row, key)?;
        if let Some(k) = k {
            right_by_key.entry(k).or_default().push(idx);
        }
        right_keys.push(k);
    }

    let mut left_order: Vec<(Option<i64>, usize)> = left
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, row)| Ok((key_of(left_key, row, key)?, idx)))
        .collect::<Result<_>>()?;
    left_order.sort_by(|a, b| cmp_missing_last(a.0, b.0));

    let mut joined = Table::new(columns);
    let mut matched = vec![false; right.len()];

    for (k, idx) in &left_order {
        let base: Vec<Value> = std::iter::once(Value::from_opt_int(*k))
            .chain(left_cols.iter().map(|&i| left.rows()[*idx][i].clone()))
            .collect();
        let matches = k.and_then(|k| right_by_key.get(&k));
        match matches {
            Some(ridxs) => {
                for &r in ridxs {
                    matched[r] = true;
                    let mut row = base.clone();
                    row.extend(right_cols.iter().map(|&i| right.rows()[r][i].clone()));
                    joined.push_row(row);
                }
            }
            None => {
                let mut row = base;
                row.extend(right_cols.iter().map(|_| Value::Missing));
                joined.push_row(row);
            }
        }
    }

    let mut unmatched: Vec<usize> = (0..right.len()).filter(|&r| !matched[r]).collect();
    unmatched.sort_by(|&a, &b| cmp_missing_last(right_keys[a], right_keys[b]));
    for r in &unmatched {
        let row: Vec<Value> = std::iter::once(Value::from_opt_int(right_keys[*r]))
            .chain(left_cols.iter().map(|_| Value::Missing))
            .chain(right_cols.iter().map(|&i| right.rows()[*r][i].clone()))
            .collect();
        joined.push_row(row);
    }

    debug!(
        "Outer join on {}: {} left rows, {} right rows, {} right-only rows, {} joined rows",
        key,
        left.len(),
        right.len(),
        unmatched.len(),
        joined.len()
    );
    Ok(joined)
}
