use serde::{Deserialize, Serialize};
use std::time::Instant;

/// How much a failing check matters for the deployment verdict
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Critical,
    Minor,
}

/// Outcome of a single check, immutable once recorded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub details: String,
    pub expected_status: Option<u16>,
    pub actual_status: Option<u16>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    pub timestamp: String,
}

impl TestResult {
    pub fn new(name: &str, success: bool, details: &str) -> Self {
        Self {
            name: name.to_string(),
            success,
            details: details.to_string(),
            expected_status: None,
            actual_status: None,
            severity: Severity::Critical,
            skipped: false,
            duration_ms: None,
            timestamp: chrono::Local::now().to_rfc3339(),
        }
    }

    pub fn skipped(name: &str, reason: &str) -> Self {
        Self {
            skipped: true,
            ..Self::new(name, false, reason)
        }
    }

    pub fn with_status(mut self, expected: Option<u16>, actual: Option<u16>) -> Self {
        self.expected_status = expected;
        self.actual_status = actual;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_duration(mut self, started: Instant) -> Self {
        self.duration_ms = Some(started.elapsed().as_millis() as u64);
        self
    }

    pub fn is_failure(&self) -> bool {
        !self.success && !self.skipped
    }
}

/// Accumulated state of one run
#[derive(Debug, Clone)]
pub struct RunnerState {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub refresh_token: Option<String>,
    pub tests_run: u32,
    pub tests_passed: u32,
    pub results: Vec<TestResult>,
    pub started_at: Instant,
}

impl RunnerState {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            auth_token: None,
            refresh_token: None,
            tests_run: 0,
            tests_passed: 0,
            results: Vec::new(),
            started_at: Instant::now(),
        }
    }

    /// Append a result; skipped results are kept but not counted as runs
    pub fn record(&mut self, result: TestResult) {
        if !result.skipped {
            self.tests_run += 1;
            if result.success {
                self.tests_passed += 1;
            }
        }
        self.results.push(result);
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| r.is_failure())
    }

    pub fn all_passed(&self) -> bool {
        self.tests_passed == self.tests_run
    }

    pub fn summary(&self) -> TestSummary {
        let skipped = self.results.iter().filter(|r| r.skipped).count() as u32;
        let success_rate = if self.tests_run > 0 {
            self.tests_passed as f64 / self.tests_run as f64 * 100.0
        } else {
            0.0
        };

        TestSummary {
            total: self.tests_run,
            passed: self.tests_passed,
            failed: self.tests_run - self.tests_passed,
            skipped,
            success_rate,
            duration_ms: self.started_at.elapsed().as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub success_rate: f64,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_updates_counters() {
        let mut state = RunnerState::new("http://localhost:3001");
        state.record(TestResult::new("health", true, ""));
        state.record(TestResult::new("login", false, "No token in response"));
        state.record(TestResult::skipped("me", "no auth token"));

        assert_eq!(state.tests_run, 2);
        assert_eq!(state.tests_passed, 1);
        assert_eq!(state.results.len(), 3);
        assert!(!state.all_passed());

        let failures: Vec<_> = state.failures().map(|r| r.name.as_str()).collect();
        assert_eq!(failures, vec!["login"]);
    }

    #[test]
    fn test_summary_rates() {
        let mut state = RunnerState::new("http://localhost:3001");
        assert_eq!(state.summary().success_rate, 0.0);

        for i in 0..4 {
            state.record(TestResult::new(&format!("check {}", i), i != 0, ""));
        }
        let summary = state.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);
        assert!((summary.success_rate - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_run_counts_as_passed() {
        let state = RunnerState::new("http://localhost:3001");
        assert!(state.all_passed());
    }
}
