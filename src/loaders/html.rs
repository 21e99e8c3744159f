use super::{dedupe_headers, fetch, TableLoader};
use crate::constants::{DEFAULT_NA_VALUES, DEFAULT_TABLE_ID};
use crate::error::{MetadataError, Result};
use crate::table::{Table, Value};
use scraper::{ElementRef, Html, Selector};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

/// Where the HTML markup comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlSource {
    Url(String),
    Path(PathBuf),
    Markup(String),
}

impl HtmlSource {
    /// Treat `http…`/`www…` locations as URLs and everything else as a path.
    pub fn from_location(location: &str, base_dir: &std::path::Path) -> Self {
        if location.starts_with("http") || location.starts_with("www") {
            HtmlSource::Url(location.to_string())
        } else {
            HtmlSource::Path(base_dir.join(location))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            HtmlSource::Url(url) => url.clone(),
            HtmlSource::Path(path) => path.display().to_string(),
            HtmlSource::Markup(markup) => format!("<inline markup, {} bytes>", markup.len()),
        }
    }

    pub fn read(&self) -> Result<String> {
        match self {
            HtmlSource::Url(url) => fetch::get(url),
            HtmlSource::Path(path) => {
                fs::read_to_string(path).map_err(|e| MetadataError::io(path, e))
            }
            HtmlSource::Markup(markup) => Ok(markup.clone()),
        }
    }
}

/// Loads the `n`-th `<table>` carrying the configured attributes.
#[derive(Debug, Clone)]
pub struct HtmlTableLoader {
    source: HtmlSource,
    attrs: Vec<(String, String)>,
    n: usize,
    na_values: Vec<String>,
}

impl HtmlTableLoader {
    pub fn new(source: HtmlSource) -> Self {
        Self {
            source,
            attrs: vec![("id".to_string(), DEFAULT_TABLE_ID.to_string())],
            n: 0,
            na_values: DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_attrs(mut self, attrs: Vec<(String, String)>) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_na_values(mut self, na_values: Vec<String>) -> Self {
        self.na_values = na_values;
        self
    }

    /// Read the `n`-th matching table instead of the first.
    pub fn nth(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    pub fn selector(&self) -> String {
        let mut selector = String::from("table");
        for (name, value) in &self.attrs {
            selector.push_str(&format!("[{}=\"{}\"]", name, value.replace('"', "\\\"")));
        }
        selector
    }
}

impl TableLoader for HtmlTableLoader {
    fn source_name(&self) -> String {
        self.source.describe()
    }

    #[instrument(skip(self), fields(source = %self.source.describe()))]
    fn load(&self) -> Result<Table> {
        let markup = self.source.read()?;
        let table = parse_html_table(
            &markup,
            &self.selector(),
            self.n,
            &self.na_values,
            &self.source_name(),
        )?;
        info!(
            "Loaded HTML table with {} rows and {} columns",
            table.len(),
            table.columns().len()
        );
        Ok(table)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| MetadataError::Config(format!("invalid selector '{}': {:?}", css, e)))
}

fn cell_text(cell: &ElementRef) -> String {
    let raw: String = cell.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn inside_thead(row: &ElementRef) -> bool {
    row.ancestors()
        .filter_map(|node| node.value().as_element())
        .any(|el| el.name() == "thead")
}

/// Extract the `n`-th table matching `css` from `markup`.
///
/// Placeholder tokens in `na_values` and empty cells become missing, then
/// column types are inferred. A selector miss is an error.
pub fn parse_html_table(
    markup: &str,
    css: &str,
    n: usize,
    na_values: &[String],
    source_name: &str,
) -> Result<Table> {
    let document = Html::parse_document(markup);
    let table_sel = selector(css)?;
    let row_sel = selector("tr")?;
    let header_cell_sel = selector("th")?;
    let cell_sel = selector("th, td")?;
    let data_cell_sel = selector("td")?;

    let table_el = document
        .select(&table_sel)
        .nth(n)
        .ok_or_else(|| MetadataError::TableNotFound {
            selector: css.to_string(),
            n,
            source_name: source_name.to_string(),
        })?;

    let rows: Vec<ElementRef> = table_el.select(&row_sel).collect();

    let header_row = rows
        .iter()
        .find(|row| inside_thead(row))
        .or_else(|| {
            rows.iter().find(|row| {
                row.select(&header_cell_sel).next().is_some()
                    && row.select(&data_cell_sel).next().is_none()
            })
        });
    let mut headers: Vec<String> = header_row
        .map(|row| row.select(&cell_sel).map(|c| cell_text(&c)).collect())
        .unwrap_or_default();

    let body: Vec<Vec<Value>> = rows
        .iter()
        .filter(|row| !inside_thead(row) && row.select(&data_cell_sel).next().is_some())
        .map(|row| {
            row.select(&cell_sel)
                .map(|c| Value::from_field(&cell_text(&c), na_values))
                .collect()
        })
        .collect();

    let width = body.iter().map(Vec::len).max().unwrap_or(0);
    if headers.is_empty() {
        headers = (0..width).map(|i| i.to_string()).collect();
    }
    debug!(
        "Table {} has {} header cells and {} body rows",
        css,
        headers.len(),
        body.len()
    );

    let mut table = Table::new(dedupe_headers(headers));
    for row in body {
        table.push_row(row);
    }
    table.infer_types();
    Ok(table)
}
