pub mod concurrent_reader;
pub mod csv_reader;
pub mod href;

pub use concurrent_reader::ConcurrentReader;
pub use csv_reader::StationCsvReader;
pub use href::{is_remote, modify_href, read_file_list, HrefModifier};
