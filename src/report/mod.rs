pub mod json;
pub mod junit;
pub mod types;

use crate::runner::state::RunnerState;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub use types::RunReport;

/// File name of the saved JSON results
pub const RESULTS_FILE: &str = "api-probe-results.json";

/// Generate report from a saved results file
pub fn generate_report(results_path: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let results = std::fs::read_to_string(results_path)
        .with_context(|| format!("Failed to read {}", results_path.display()))?;
    let report: RunReport = serde_json::from_str(&results)
        .with_context(|| format!("{} is not an api-probe results file", results_path.display()))?;

    match format {
        "json" => json::generate(&report, output),
        "junit" | "xml" => {
            let xml = junit::generate_junit_xml(&report)?;
            match output {
                Some(path) => {
                    std::fs::write(path, xml)?;
                    println!("JUnit report saved to: {}", path.display());
                }
                None => println!("{}", xml),
            }
            Ok(())
        }
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}

/// Save JSON and JUnit reports for a finished suite under `<output>/<suite>/`
pub fn write_reports(suite_name: &str, state: &RunnerState, output_dir: &Path) -> Result<()> {
    let dir = output_dir.join(slug(suite_name));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let report = RunReport::from_state(suite_name, state);

    let json_path = dir.join(RESULTS_FILE);
    std::fs::write(&json_path, serde_json::to_string_pretty(&report)?)?;
    println!(
        "\n{} JSON report saved to: {}",
        "📄".to_string().blue(),
        json_path.display().to_string().cyan()
    );

    junit::write_report(&report, &dir)?;
    Ok(())
}

/// Directory-safe form of a suite name
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "suite".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::state::TestResult;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Backend API"), "backend-api");
        assert_eq!(slug("  Blog / 501 fix "), "blog-501-fix");
        assert_eq!(slug("***"), "suite");
    }

    #[test]
    fn test_write_and_regenerate() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = RunnerState::new("http://localhost:3001");
        state.record(TestResult::new("API Health Check", true, ""));
        state.record(TestResult::new("Admin Login", false, "No token in response"));

        write_reports("Backend API", &state, dir.path()).unwrap();

        let suite_dir = dir.path().join("backend-api");
        let saved = suite_dir.join(RESULTS_FILE);
        assert!(saved.exists());
        assert!(suite_dir.join("junit.xml").exists());

        let report: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&saved).unwrap()).unwrap();
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.results[1].details, "No token in response");

        let xml_path = dir.path().join("again.xml");
        generate_report(&saved, "junit", Some(&xml_path)).unwrap();
        assert!(std::fs::read_to_string(&xml_path)
            .unwrap()
            .contains(r#"failures="1""#));

        assert!(generate_report(&saved, "html", None).is_err());
    }
}
