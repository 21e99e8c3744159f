//! Stage 4: write finished tables to comma-separated files.
//!
//! Each file is rewritten from scratch on every run.

use crate::error::{MetadataError, Result};
use crate::table::{IndexedTable, Table};
use csv::Writer;
use std::fs;
use std::path::Path;
use tracing::info;

fn open_writer(path: &Path) -> Result<Writer<fs::File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| MetadataError::io(parent, e))?;
    }
    Ok(Writer::from_path(path)?)
}

/// Write `table` with a header row and no index column.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let mut writer = open_writer(path)?;
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|v| v.to_field()))?;
    }
    writer.flush().map_err(|e| MetadataError::io(path, e))?;
    info!("Stored {} ({} rows)", path.display(), table.len());
    Ok(())
}

/// Write `table` with its index as the first column.
pub fn write_indexed_table(path: &Path, table: &IndexedTable) -> Result<()> {
    write_table(path, &table.to_table_with_index())
}

/// Write the inferred column types of `table`: a `,dtypes` header followed
/// by one `column,dtype` row per column.
pub fn write_dtypes(path: &Path, table: &Table) -> Result<()> {
    let mut writer = open_writer(path)?;
    writer.write_record(["", "dtypes"])?;
    for (name, dtype) in table.dtypes() {
        writer.write_record([name.as_str(), dtype.as_str()])?;
    }
    writer.flush().map_err(|e| MetadataError::io(path, e))?;
    info!("Stored column types to {}", path.display());
    Ok(())
}
