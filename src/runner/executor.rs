use anyhow::Result;
use colored::Colorize;
use serde_json::{json, Value};
use std::time::Instant;

use super::client::{ApiClient, ApiResponse, HttpMethod};
use super::context::lookup;
use super::state::{RunnerState, Severity, TestResult};
use crate::utils::config::Config;

const TOKEN_POINTERS: &[&str] = &["/data/token", "/token", "/data/accessToken", "/accessToken"];
const REFRESH_POINTERS: &[&str] = &["/data/refreshToken", "/refreshToken"];

/// Status that means a route exists in config but was never wired up
const NOT_IMPLEMENTED: u16 = 501;

/// One HTTP check: request, expected status and optional JSON assertions
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub expected_status: u16,
    /// When set, any status but this one passes and `expected_status` is ignored
    pub forbidden_status: Option<u16>,
    pub use_auth: bool,
    pub severity: Severity,
    /// JSON pointer -> expected value
    pub json: Vec<(String, Value)>,
    /// JSON pointers that must be present
    pub has: Vec<String>,
}

impl CheckRequest {
    pub fn new(method: HttpMethod, path: &str, expected_status: u16) -> Self {
        Self {
            name: format!("{} {}", method, path),
            method,
            path: path.to_string(),
            body: None,
            expected_status,
            forbidden_status: None,
            use_auth: false,
            severity: Severity::Critical,
            json: Vec::new(),
            has: Vec::new(),
        }
    }

    /// Exact status this check asserts, if any
    pub fn expected(&self) -> Option<u16> {
        match self.forbidden_status {
            Some(_) => None,
            None => Some(self.expected_status),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn expect_not(mut self, status: u16) -> Self {
        self.forbidden_status = Some(status);
        self
    }

    pub fn auth(mut self, use_auth: bool) -> Self {
        self.use_auth = use_auth;
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn expect_json(mut self, pointer: &str, value: Value) -> Self {
        self.json.push((pointer.to_string(), value));
        self
    }

    pub fn expect_present(mut self, pointer: &str) -> Self {
        self.has.push(pointer.to_string());
        self
    }
}

/// What a check observed
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub success: bool,
    pub status: Option<u16>,
    pub body: Value,
}

/// Drives HTTP checks against one API and accumulates their results
pub struct ApiRunner {
    client: ApiClient,
    state: RunnerState,
    login_path: String,
    refresh_path: String,
}

impl ApiRunner {
    pub fn new(config: &Config) -> Result<Self> {
        let client = ApiClient::new(&config.base_url, config.timeout())?;
        let state = RunnerState::new(client.base_url());

        Ok(Self {
            client,
            state,
            login_path: config.login_path.clone(),
            refresh_path: config.refresh_path.clone(),
        })
    }

    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    pub fn into_state(self) -> RunnerState {
        self.state
    }

    pub fn has_token(&self) -> bool {
        self.state.auth_token.is_some()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.state.refresh_token.is_some()
    }

    /// Seed the credential cache, e.g. from `--token`
    pub fn set_token(&mut self, token: &str) {
        self.state.auth_token = Some(token.to_string());
    }

    /// Issue one request and compare its status with `expected_status`
    pub async fn check(
        &mut self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        expected_status: u16,
        use_auth: bool,
    ) -> CheckOutcome {
        let req = CheckRequest::new(method, path, expected_status)
            .body(body)
            .auth(use_auth);
        self.check_request(&req).await
    }

    pub async fn check_request(&mut self, req: &CheckRequest) -> CheckOutcome {
        let (result, response) = self.exchange(req).await;
        let outcome = CheckOutcome {
            success: result.success,
            status: result.actual_status,
            body: response_body(&response, &result),
        };

        let failed_response = if result.success { None } else { response };
        self.record(result);
        if let Some(res) = failed_response {
            print_diagnostics(&res, req);
        }
        outcome
    }

    /// POST credentials and cache the returned token(s)
    pub async fn login(&mut self, credentials: &Value) -> bool {
        let path = self.login_path.clone();
        self.login_with("Login", &path, credentials, 200, Severity::Critical)
            .await
    }

    pub async fn login_with(
        &mut self,
        name: &str,
        path: &str,
        credentials: &Value,
        expected_status: u16,
        severity: Severity,
    ) -> bool {
        let req = CheckRequest::new(HttpMethod::Post, path, expected_status)
            .named(name)
            .body(Some(credentials.clone()))
            .severity(severity);

        let (mut result, response) = self.exchange(&req).await;

        // Only a successful login is expected to hand out a token
        let wants_token = (200..300).contains(&expected_status);
        if result.success && wants_token {
            let body = response.as_ref().map(|r| &r.body);
            match body.and_then(|b| find_string(b, TOKEN_POINTERS)) {
                Some(token) => {
                    self.state.auth_token = Some(token);
                    self.state.refresh_token = body.and_then(|b| find_string(b, REFRESH_POINTERS));
                }
                None => {
                    log::warn!("Login to {} succeeded without a token", path);
                    result.success = false;
                    result.details = "No token in response".to_string();
                }
            }
        }

        let success = result.success;
        let failed_response = if success { None } else { response };
        self.record(result);
        if let Some(res) = failed_response {
            print_diagnostics(&res, &req);
        }
        success
    }

    /// Exchange the cached refresh token for a new access token
    pub async fn refresh(&mut self) -> bool {
        let path = self.refresh_path.clone();
        self.refresh_with("Token Refresh", &path, Severity::Critical)
            .await
    }

    pub async fn refresh_with(&mut self, name: &str, path: &str, severity: Severity) -> bool {
        let refresh_token = match self.state.refresh_token.clone() {
            Some(t) => t,
            None => {
                self.skip(name, "no refresh token from login");
                return false;
            }
        };

        let req = CheckRequest::new(HttpMethod::Post, path, 200)
            .named(name)
            .body(Some(json!({ "refreshToken": refresh_token })))
            .severity(severity);

        let outcome = self.check_request(&req).await;
        if outcome.success {
            if let Some(token) = find_string(&outcome.body, TOKEN_POINTERS) {
                self.state.auth_token = Some(token);
            }
            if let Some(token) = find_string(&outcome.body, REFRESH_POINTERS) {
                self.state.refresh_token = Some(token);
            }
        }
        outcome.success
    }

    /// CORS preflight: 200/204 plus an `Access-Control-Allow-Origin` header
    pub async fn preflight(
        &mut self,
        name: &str,
        path: &str,
        origin: &str,
        request_method: &str,
        request_headers: &str,
        severity: Severity,
    ) -> bool {
        let started = Instant::now();
        let headers = [
            ("Origin", origin),
            ("Access-Control-Request-Method", request_method),
            ("Access-Control-Request-Headers", request_headers),
        ];

        let result = match self.client.options(path, &headers).await {
            Ok(res) => {
                let allow_origin = res.header("access-control-allow-origin");
                let success = matches!(res.status, 200 | 204) && allow_origin.is_some();
                let details = format!(
                    "Status: {}, Allow-Origin: {}, Allow-Methods: {}, Allow-Headers: {}",
                    res.status,
                    allow_origin.unwrap_or("-"),
                    res.header("access-control-allow-methods").unwrap_or("-"),
                    res.header("access-control-allow-headers").unwrap_or("-"),
                );
                TestResult::new(name, success, &details).with_status(None, Some(res.status))
            }
            Err(e) => TestResult::new(name, false, &e.to_string()),
        };

        let success = result.success;
        self.record(result.with_severity(severity).with_duration(started));
        success
    }

    /// Record a skipped step; it does not count as a run
    pub fn skip(&mut self, name: &str, reason: &str) {
        println!(
            "{} {} - {}: {}",
            "⏭".dimmed(),
            name,
            "SKIPPED".yellow(),
            reason
        );
        self.state.record(TestResult::skipped(name, reason));
    }

    /// Print the pass/fail line and append to the run's results
    pub fn record(&mut self, result: TestResult) {
        print_result(&result);
        self.state.record(result);
    }

    /// Print totals and failing checks; true when every check passed
    pub fn summarize(&self) -> bool {
        let summary = self.state.summary();

        println!("\n{}", "=".repeat(60));
        println!("{} TEST SUMMARY", "📊");
        println!("{}", "=".repeat(60));
        println!("Total Tests: {}", summary.total);
        println!("Passed: {}", summary.passed.to_string().green());
        println!("Failed: {}", summary.failed.to_string().red());
        if summary.skipped > 0 {
            println!("Skipped: {}", summary.skipped.to_string().yellow());
        }
        println!("Success Rate: {:.1}%", summary.success_rate);

        let critical: Vec<&TestResult> = self
            .state
            .failures()
            .filter(|r| r.severity == Severity::Critical)
            .collect();
        let minor: Vec<&TestResult> = self
            .state
            .failures()
            .filter(|r| r.severity == Severity::Minor)
            .collect();

        if !critical.is_empty() {
            println!("\n{} FAILED TESTS:", "❌".red());
            for test in &critical {
                println!("  - {}: {}", test.name, test.details);
            }
        }
        if !minor.is_empty() {
            println!("\n{} MINOR ISSUES:", "⚠️".yellow());
            for test in &minor {
                println!("  - {}: {}", test.name, test.details);
            }
        }

        self.state.all_passed()
    }

    /// Send a request and classify it without recording anything
    async fn exchange(&self, req: &CheckRequest) -> (TestResult, Option<ApiResponse>) {
        let started = Instant::now();
        let token = if req.use_auth {
            self.state.auth_token.as_deref()
        } else {
            None
        };

        let response = match self
            .client
            .send(req.method, &req.path, req.body.as_ref(), token)
            .await
        {
            Ok(res) => res,
            Err(e) => {
                let result = TestResult::new(&req.name, false, &e.to_string())
                    .with_status(req.expected(), None)
                    .with_severity(req.severity)
                    .with_duration(started);
                return (result, None);
            }
        };

        let mut severity = req.severity;
        let mut problems = Vec::new();

        if let Some(problem) = status_problem(response.status, req) {
            if response.status == NOT_IMPLEMENTED {
                severity = Severity::Critical;
            }
            problems.push(problem);
        } else {
            problems.extend(json_problems(&response.body, &req.json, &req.has));
        }

        let result = TestResult::new(&req.name, problems.is_empty(), &problems.join("; "))
            .with_status(req.expected(), Some(response.status))
            .with_severity(severity)
            .with_duration(started);

        (result, Some(response))
    }
}

/// Why `status` fails the request's status assertion, if it does.
///
/// A 501 is a critical regression unless the check asked for exactly 501.
pub fn status_problem(status: u16, req: &CheckRequest) -> Option<String> {
    let accepted = match req.forbidden_status {
        Some(forbidden) => status != forbidden && status != NOT_IMPLEMENTED,
        None => status == req.expected_status,
    };
    if accepted {
        return None;
    }

    let wanted = match req.forbidden_status {
        Some(forbidden) => format!("anything but {}", forbidden),
        None => req.expected_status.to_string(),
    };
    if status == NOT_IMPLEMENTED {
        Some(format!(
            "CRITICAL REGRESSION: {} Not Implemented (expected {})",
            NOT_IMPLEMENTED, wanted
        ))
    } else {
        Some(format!("Status: {} (expected {})", status, wanted))
    }
}

/// Mismatches between a body and its JSON expectations
pub fn json_problems(body: &Value, expected: &[(String, Value)], present: &[String]) -> Vec<String> {
    let mut problems = Vec::new();
    for (pointer, want) in expected {
        match lookup(body, pointer) {
            Some(got) if got == want => {}
            Some(got) => problems.push(format!("{}: expected {}, got {}", pointer, want, got)),
            None => problems.push(format!("{}: expected {}, got nothing", pointer, want)),
        }
    }
    for pointer in present {
        if lookup(body, pointer).is_none() {
            problems.push(format!("{}: missing", pointer));
        }
    }
    problems
}

fn find_string(body: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .filter_map(|p| body.pointer(p))
        .filter_map(|v| v.as_str())
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn response_body(response: &Option<ApiResponse>, result: &TestResult) -> Value {
    match response {
        Some(res) => res.body.clone(),
        None => json!({ "error": result.details }),
    }
}

fn print_result(result: &TestResult) {
    if result.skipped {
        return;
    }
    if result.success {
        println!("{} {} - {}", "✅".green(), result.name, "PASSED".green());
        return;
    }
    match result.severity {
        Severity::Critical => println!(
            "{} {} - {}: {}",
            "❌".red(),
            result.name,
            "FAILED".red().bold(),
            result.details
        ),
        Severity::Minor => println!(
            "{} {} - {}: {}",
            "⚠️".yellow(),
            result.name,
            "MINOR ISSUE".yellow(),
            result.details
        ),
    }
}

fn print_diagnostics(response: &ApiResponse, req: &CheckRequest) {
    // Status line only when the status itself was wrong
    if let Some(problem) = status_problem(response.status, req) {
        println!("   {}", problem);
    }
    let pretty =
        serde_json::to_string_pretty(&response.body).unwrap_or_else(|_| response.body.to_string());
    println!("   Response: {}", pretty);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_problems() {
        let body = json!({"success": true, "data": {"token": "abc"}});
        let expected = vec![("/success".to_string(), json!(true))];
        assert!(json_problems(&body, &expected, &["/data/token".to_string()]).is_empty());

        let wrong = vec![("/success".to_string(), json!(false))];
        let problems = json_problems(&body, &wrong, &["/data/user".to_string()]);
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0], "/success: expected false, got true");
        assert_eq!(problems[1], "/data/user: missing");
    }

    #[test]
    fn test_find_token_pointers() {
        let nested = json!({"data": {"token": "t1", "refreshToken": "r1"}});
        assert_eq!(find_string(&nested, TOKEN_POINTERS).as_deref(), Some("t1"));
        assert_eq!(find_string(&nested, REFRESH_POINTERS).as_deref(), Some("r1"));

        let flat = json!({"token": "t2"});
        assert_eq!(find_string(&flat, TOKEN_POINTERS).as_deref(), Some("t2"));

        let none = json!({"data": {"token": ""}});
        assert!(find_string(&none, TOKEN_POINTERS).is_none());
    }

    #[test]
    fn test_status_problem_exact_and_forbidden() {
        let exact = CheckRequest::new(HttpMethod::Post, "/api/blog", 401);
        assert!(status_problem(401, &exact).is_none());
        assert_eq!(
            status_problem(200, &exact).as_deref(),
            Some("Status: 200 (expected 401)")
        );
        assert!(status_problem(501, &exact)
            .unwrap()
            .starts_with("CRITICAL REGRESSION"));

        let not_501 = CheckRequest::new(HttpMethod::Put, "/api/blog/test-id", 200).expect_not(501);
        assert_eq!(not_501.expected(), None);
        for status in [200, 401, 403, 404] {
            assert!(status_problem(status, &not_501).is_none(), "{}", status);
        }
        assert_eq!(
            status_problem(501, &not_501).as_deref(),
            Some("CRITICAL REGRESSION: 501 Not Implemented (expected anything but 501)")
        );

        let not_404 = CheckRequest::new(HttpMethod::Get, "/api/blog", 200).expect_not(404);
        assert_eq!(
            status_problem(404, &not_404).as_deref(),
            Some("Status: 404 (expected anything but 404)")
        );
        assert!(status_problem(501, &not_404)
            .unwrap()
            .starts_with("CRITICAL REGRESSION"));

        let wants_501 = CheckRequest::new(HttpMethod::Get, "/api/legacy", 501);
        assert!(status_problem(501, &wants_501).is_none());
    }

    #[test]
    fn test_default_check_label() {
        let req = CheckRequest::new(HttpMethod::Get, "/api/health", 200);
        assert_eq!(req.name, "GET /api/health");
        assert!(!req.use_auth);
    }
}
