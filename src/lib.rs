pub mod parser;
pub mod report;
pub mod runner;
pub mod suites;
pub mod utils;

// Re-export common items
pub use report::generate_report;
pub use runner::executor::ApiRunner;
pub use runner::{run_suite, run_target, RunOptions, RunOutcome};
