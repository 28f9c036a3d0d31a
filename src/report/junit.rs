use super::types::RunReport;
use crate::runner::state::TestResult;
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

/// Generate JUnit XML report string from a RunReport
pub fn generate_junit_xml(report: &RunReport) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let total_tests = report.results.len();
    let failures = report.results.iter().filter(|r| r.is_failure()).count();
    let skipped = report.results.iter().filter(|r| r.skipped).count();
    let time = seconds(report.summary.duration_ms);

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "api-probe-run"));
    suites_start.push_attribute(("tests", total_tests.to_string().as_str()));
    suites_start.push_attribute(("failures", failures.to_string().as_str()));
    suites_start.push_attribute(("skipped", skipped.to_string().as_str()));
    suites_start.push_attribute(("time", time.as_str()));
    writer.write_event(Event::Start(suites_start))?;

    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", report.suite_name.as_str()));
    suite_start.push_attribute(("tests", total_tests.to_string().as_str()));
    suite_start.push_attribute(("failures", failures.to_string().as_str()));
    suite_start.push_attribute(("skipped", skipped.to_string().as_str()));
    suite_start.push_attribute(("id", report.session_id.as_str()));
    suite_start.push_attribute(("time", time.as_str()));
    suite_start.push_attribute(("timestamp", report.generated_at.as_str()));
    suite_start.push_attribute(("hostname", report.base_url.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    let classname = report.suite_name.to_lowercase().replace(' ', ".");
    for result in &report.results {
        write_test_case(&mut writer, &classname, result)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let result = writer.into_inner().into_inner();
    let xml = String::from_utf8(result)?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    classname: &str,
    result: &TestResult,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", result.name.as_str()));
    case_start.push_attribute(("classname", classname));
    case_start.push_attribute(("time", seconds(result.duration_ms.unwrap_or(0)).as_str()));
    writer.write_event(Event::Start(case_start))?;

    if result.skipped {
        let mut skip = BytesStart::new("skipped");
        skip.push_attribute(("message", result.details.as_str()));
        writer.write_event(Event::Empty(skip))?;
    } else if !result.success {
        // No status means the request never got an answer
        let kind = if result.actual_status.is_some() {
            "AssertionError"
        } else {
            "TransportError"
        };

        let mut fail_start = BytesStart::new("failure");
        fail_start.push_attribute(("message", result.details.as_str()));
        fail_start.push_attribute(("type", kind));
        writer.write_event(Event::Start(fail_start))?;

        let mut text = result.details.clone();
        if let (Some(expected), Some(actual)) = (result.expected_status, result.actual_status) {
            text = format!("{}\nexpected status {}, got {}", text, expected, actual);
        }
        writer.write_event(Event::Text(BytesText::new(&text)))?;

        writer.write_event(Event::End(BytesEnd::new("failure")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

fn seconds(ms: u64) -> String {
    (ms as f64 / 1000.0).to_string()
}

/// Write report to file
pub fn write_report(report: &RunReport, output_dir: &Path) -> Result<()> {
    let xml = generate_junit_xml(report)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    println!("    Generated JUnit report: {}", path.display());
    Ok(())
}
