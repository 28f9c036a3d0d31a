use crate::runner::state::{RunnerState, TestResult, TestSummary};
use serde::{Deserialize, Serialize};

/// Saved outcome of one suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub session_id: String,
    pub suite_name: String,
    pub base_url: String,
    pub summary: TestSummary,
    pub results: Vec<TestResult>,
    pub generated_at: String,
}

impl RunReport {
    pub fn from_state(suite_name: &str, state: &RunnerState) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            suite_name: suite_name.to_string(),
            base_url: state.base_url.clone(),
            summary: state.summary(),
            results: state.results.clone(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
