pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use coordinates::{parse_coordinate, point_to_wkb, wkb_to_point};
pub use filename::{artifact_files, artifact_path, partition_file_name};
pub use progress::ProgressReporter;
