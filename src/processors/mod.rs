pub mod geometry;
pub mod metadata_projector;
pub mod pipeline;
pub mod schema_census;
pub mod schema_reconciler;
pub mod type_normalizer;

pub use geometry::{DerivedGeometry, Envelope, EnvelopePolicy, GeometryDeriver};
pub use metadata_projector::{MetadataProjector, Projection};
pub use pipeline::{PipelineReport, TabularPipeline};
pub use schema_census::SchemaCensus;
pub use schema_reconciler::SchemaReconciler;
pub use type_normalizer::TypeNormalizer;
