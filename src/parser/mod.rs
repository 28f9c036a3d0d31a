pub mod types;
pub mod yaml;

pub use types::*;
pub use yaml::{parse_suite_content, parse_suite_file};
