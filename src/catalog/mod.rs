pub mod column_metadata;
pub mod source;

pub use column_metadata::ColumnMetadataCatalog;
pub use source::{CatalogSource, DirectoryCatalogSource, InMemoryCatalogSource};
