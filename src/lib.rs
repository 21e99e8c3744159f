pub mod assemble;
pub mod config;
pub mod constants;
pub mod error;
pub mod join;
pub mod loaders;
pub mod logging;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod table;

pub use config::PipelineConfig;
pub use error::{MetadataError, Result};
pub use pipeline::{Pipeline, PipelineResult};
