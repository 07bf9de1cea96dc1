pub mod asset;
pub mod column;
pub mod dataset;
pub mod station;
pub mod table;

pub use asset::{ColumnSummary, TableAsset};
pub use column::{is_flag_column, ColumnDescriptor, ColumnSet, StorageKind};
pub use dataset::{DatasetKey, Frequency, Period};
pub use station::StationPoint;
pub use table::{
    Cell, ColumnData, Literal, LiteralKind, NormalizedColumn, NormalizedTable, RawBatch,
    RawColumn, StationTable,
};
