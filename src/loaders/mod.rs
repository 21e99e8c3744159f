//! Stage 1: read each catalog source into a [`Table`](crate::table::Table).

pub mod cap_files;
pub mod delimited;
pub mod fetch;
pub mod html;

pub use cap_files::{discover_cap_files, CapFile, CapListing};
pub use delimited::DelimitedLoader;
pub use html::{HtmlSource, HtmlTableLoader};

use crate::error::Result;
use crate::table::Table;
use std::collections::HashMap;

/// A source that can be read into a uniform table.
pub trait TableLoader {
    /// Short human-readable name of the source, used in logs and errors.
    fn source_name(&self) -> String;

    fn load(&self) -> Result<Table>;
}

/// Make header names unique and non-empty the way table readers usually do:
/// blanks become `Unnamed: i`, repeats get a `.k` suffix.
pub(crate) fn dedupe_headers(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let name = if name.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                name
            };
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name.clone()
            } else {
                format!("{}.{}", name, count)
            };
            *count += 1;
            unique
        })
        .collect()
}
