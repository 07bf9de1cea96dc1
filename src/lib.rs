pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod processors;
pub mod readers;
pub mod utils;
pub mod writers;

pub use catalog::ColumnMetadataCatalog;
pub use config::PipelineConfig;
pub use error::{ProcessingError, ProcessingWarning, Result};
pub use processors::{PipelineReport, TabularPipeline};
