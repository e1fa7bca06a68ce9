//! Recorded mocks and the files they live in.

mod file;
mod library;
mod types;

pub use file::{
    collect_mock_files, load_mock_file, parse_mocks, save_mock_file, MockFileError, MockFileFormat,
};
pub use library::{LoadReport, MockLibrary};
pub use types::{FaultTag, MockFileNode, MockNode, MockRequest, MockResponse, ServiceType};
