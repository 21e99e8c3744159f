use crate::assemble;
use crate::config::PipelineConfig;
use crate::constants::KRN_HEADER_STRIP;
use crate::error::Result;
use crate::loaders::{
    discover_cap_files, CapListing, DelimitedLoader, HtmlSource, HtmlTableLoader, TableLoader,
};
use crate::persist;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Counts reported after a successful run.
#[derive(Debug, Clone, Default)]
pub struct PipelineResult {
    pub krn_rows: usize,
    pub cap_files: usize,
    pub wiki_rows: usize,
    pub reference_rows: usize,
    pub mapping_rows: usize,
    pub output_files: Vec<PathBuf>,
}

/// Runs the four stages strictly in order.
///
/// Every source is loaded before anything is normalized, and every table
/// is built before the first file is written, so a bad input never leaves
/// a partial set of outputs behind.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// The configured URL when there is one, otherwise the cached HTML copy.
    pub fn bct_source(&self) -> HtmlSource {
        match &self.config.sources.bct_url {
            Some(url) => HtmlSource::Url(url.clone()),
            None => HtmlSource::from_location(&self.config.sources.bct_html, &self.config.base_dir),
        }
    }

    pub fn discover_cap_files(&self) -> Result<CapListing> {
        let sources = &self.config.sources;
        discover_cap_files(&self.config.resolve(&sources.cap_dir), &sources.cap_extension)
    }

    #[instrument(skip(self), fields(base_dir = %self.config.base_dir.display()))]
    pub fn run(&self) -> Result<PipelineResult> {
        let sources = &self.config.sources;
        let outputs = &self.config.outputs;

        // Stage 1: load
        let bct_loader = HtmlTableLoader::new(self.bct_source())
            .with_attrs(vec![("id".to_string(), sources.table_id.clone())])
            .nth(sources.table_index)
            .with_na_values(sources.na_values.clone());
        info!("Reading the BCT table from {}", bct_loader.source_name());
        let bct = bct_loader.load()?;

        let krn_loader = DelimitedLoader::tsv(self.config.resolve(&sources.krn_index))
            .with_skip_rows(sources.krn_skip_rows)
            .with_header_strip(KRN_HEADER_STRIP);
        info!("Reading {}", krn_loader.source_name());
        let krn_table = krn_loader.load()?;

        info!("Discovering files in {}", sources.cap_dir);
        let caps = self.discover_cap_files()?;

        let wiki_loader = DelimitedLoader::csv(self.config.resolve(&sources.wiki_csv));
        info!("Reading {}", wiki_loader.source_name());
        let wiki = assemble::prepare_wiki(wiki_loader.load()?)?;

        // Stages 2 and 3: normalize and join
        info!("Assembling metadata...");
        let krn = assemble::build_krn_metadata(krn_table)?;
        let reference = assemble::build_reference(bct)?;
        let reference_rows = reference.index().len();
        let mapping = assemble::build_mapping_table(&reference, &wiki)?;
        let riemenschneider = assemble::build_riemenschneider(reference, &krn, &caps, &self.config.corpus)?;

        // Stage 4: persist
        let krn_path = self.config.resolve(&outputs.krn_metadata);
        let dtypes_path = self.config.resolve(&outputs.krn_metadata_dtypes);
        let mapping_path = self.config.resolve(&outputs.mapping_table);
        let riemenschneider_path = self.config.resolve(&outputs.riemenschneider);

        persist::write_table(&krn_path, krn.table())?;
        persist::write_dtypes(&dtypes_path, krn.table())?;
        persist::write_table(&mapping_path, &mapping)?;
        persist::write_indexed_table(&riemenschneider_path, &riemenschneider)?;

        Ok(PipelineResult {
            krn_rows: krn.table().len(),
            cap_files: caps.len(),
            wiki_rows: wiki.len(),
            reference_rows,
            mapping_rows: mapping.len(),
            output_files: vec![krn_path, dtypes_path, mapping_path, riemenschneider_path],
        })
    }
}
