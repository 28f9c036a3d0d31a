use crate::runner::client::HttpMethod;
use crate::runner::state::Severity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A parsed suite file
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    pub description: Option<String>,
    /// Default server root when none is given on the command line
    pub base_url: Option<String>,
    pub vars: HashMap<String, String>,
    pub groups: Vec<StepGroup>,
}

impl Suite {
    pub fn step_count(&self) -> usize {
        self.groups.iter().map(|g| g.steps.len()).sum()
    }
}

/// Steps printed under one heading
#[derive(Debug, Clone)]
pub struct StepGroup {
    pub name: String,
    pub steps: Vec<Step>,
}

/// All supported suite steps
#[derive(Debug, Clone)]
pub enum Step {
    Check(CheckParams),
    Login(LoginParams),
    Refresh(RefreshParams),
    Preflight(PreflightParams),
    File(FileParams),
}

impl Step {
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Check(_) => "check",
            Step::Login(_) => "login",
            Step::Refresh(_) => "refresh",
            Step::Preflight(_) => "preflight",
            Step::File(_) => "file",
        }
    }
}

/// Parameters for a `check` step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckParams {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_method")]
    pub method: HttpMethod,

    pub path: String,

    #[serde(default)]
    pub body: Option<Value>,

    /// Expected HTTP status
    #[serde(default = "default_ok", alias = "status")]
    pub expect: u16,

    /// Pass on any status except this one; replaces `expect` when set
    #[serde(default, alias = "notStatus")]
    pub expect_not: Option<u16>,

    /// Attach the cached bearer token
    #[serde(default)]
    pub auth: bool,

    /// Skip the step when `auth` is set and no token is cached
    #[serde(default = "default_true")]
    pub requires_token: bool,

    #[serde(default)]
    pub severity: Severity,

    /// JSON pointer -> expected value
    #[serde(default)]
    pub json: HashMap<String, Value>,

    /// JSON pointers that must be present
    #[serde(default)]
    pub has: Vec<String>,

    /// Variable name -> JSON pointer to capture on success
    #[serde(default)]
    pub save: HashMap<String, String>,
}

/// Parameters for a `login` step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginParams {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub path: Option<String>,

    pub credentials: Value,

    #[serde(default = "default_ok", alias = "status")]
    pub expect: u16,

    #[serde(default)]
    pub severity: Severity,
}

/// Parameters for a `refresh` step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefreshParams {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub severity: Severity,
}

/// Parameters for a CORS `preflight` step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PreflightParams {
    #[serde(default)]
    pub name: Option<String>,

    pub path: String,

    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default = "default_preflight_method")]
    pub request_method: String,

    #[serde(default = "default_preflight_headers")]
    pub request_headers: String,

    #[serde(default)]
    pub severity: Severity,
}

/// Parameters for a static `file` step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileParams {
    #[serde(default)]
    pub name: Option<String>,

    pub path: String,

    #[serde(default = "default_true")]
    pub exists: bool,

    /// Substrings the file must contain
    #[serde(default)]
    pub contains: Vec<String>,

    /// Substrings the file must not contain
    #[serde(default)]
    pub not_contains: Vec<String>,

    /// JSON pointer -> expected value
    #[serde(default)]
    pub json: HashMap<String, Value>,

    /// JSON pointers that must be present
    #[serde(default)]
    pub has_keys: Vec<String>,

    #[serde(default)]
    pub severity: Severity,
}

fn default_method() -> HttpMethod {
    HttpMethod::Get
}

fn default_ok() -> u16 {
    200
}

fn default_true() -> bool {
    true
}

fn default_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_preflight_method() -> String {
    "POST".to_string()
}

fn default_preflight_headers() -> String {
    "Content-Type,Authorization".to_string()
}
