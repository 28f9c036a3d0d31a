pub mod client;
pub mod context;
pub mod executor;
pub mod files;
pub mod state;

use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::parser::types::{CheckParams, Step, Suite};
use crate::parser::yaml::parse_suite_file;
use crate::utils::config::Config;
use context::{first_unresolved, SuiteContext};
use executor::{ApiRunner, CheckRequest};

pub use client::HttpMethod;
pub use executor::CheckOutcome;
pub use state::*;

/// Settings shared by every suite of one invocation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: Config,
    /// `--var name=value` overrides
    pub vars: HashMap<String, String>,
    /// Pre-seeded bearer token
    pub token: Option<String>,
    /// Write JSON and JUnit reports
    pub report: bool,
}

/// Result of running one suite
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub suite_name: String,
    pub all_passed: bool,
    pub interrupted: bool,
    pub state: RunnerState,
}

/// Run a suite file, a directory of suites, or a built-in suite by name
pub async fn run_target(
    target: &str,
    options: &RunOptions,
    interrupt: &AtomicBool,
) -> Result<Vec<RunOutcome>> {
    let suites = load_suites(target)?;
    if suites.is_empty() {
        println!("{} No suite files found in {}", "ℹ".blue(), target);
        return Ok(Vec::new());
    }

    let mut outcomes = Vec::with_capacity(suites.len());
    for suite in &suites {
        let outcome = run_suite(suite, options, interrupt).await?;
        let stop = outcome.interrupted;
        outcomes.push(outcome);
        if stop {
            break;
        }
    }
    Ok(outcomes)
}

/// Resolve a run target into parsed suites
pub fn load_suites(target: &str) -> Result<Vec<Suite>> {
    let path = Path::new(target);

    if path.is_dir() {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.path().to_path_buf())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .map_or(false, |ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        files.sort();
        return files.iter().map(|f| parse_suite_file(f)).collect();
    }

    if path.is_file() {
        return Ok(vec![parse_suite_file(path)?]);
    }

    match crate::suites::builtin(target) {
        Some(content) => Ok(vec![crate::parser::parse_suite_content(content, target)
            .with_context(|| format!("Built-in suite '{}' is invalid", target))?]),
        None => anyhow::bail!(
            "'{}' is neither a suite file, a directory, nor a built-in suite ({})",
            target,
            crate::suites::names().join(", ")
        ),
    }
}

/// Run every step of a suite in order, then print the summary
pub async fn run_suite(
    suite: &Suite,
    options: &RunOptions,
    interrupt: &AtomicBool,
) -> Result<RunOutcome> {
    let mut config = options.config.clone();
    if !config.base_url_explicit {
        if let Some(ref url) = suite.base_url {
            config.base_url = url.clone();
        }
    }

    let mut runner = ApiRunner::new(&config)?;
    if let Some(ref token) = options.token {
        runner.set_token(token);
    }

    let mut ctx = SuiteContext::new(&config.root_dir, options.vars.clone());
    ctx.merge_defaults(&suite.vars);

    println!("{} Starting {}", "🚀".green().bold(), suite.name.bold());
    if let Some(ref description) = suite.description {
        println!("   {}", description.dimmed());
    }
    println!(
        "{} Testing API at: {}",
        "📍".blue(),
        runner.state().base_url.cyan()
    );
    println!("{}", "=".repeat(60));

    let mut interrupted = false;
    'groups: for group in &suite.groups {
        println!("\n{} Testing {}...", "🔍".blue(), group.name);
        for step in &group.steps {
            if interrupt.load(Ordering::SeqCst) {
                interrupted = true;
                break 'groups;
            }
            run_step(&mut runner, &mut ctx, &config, step).await;
        }
    }
    if interrupt.load(Ordering::SeqCst) {
        interrupted = true;
    }

    if interrupted {
        println!("\n{} Tests interrupted by user", "⚠️".yellow());
    }

    let all_passed = runner.summarize() && !interrupted;
    let state = runner.into_state();

    if options.report {
        crate::report::write_reports(&suite.name, &state, &config.output_dir)?;
    }

    Ok(RunOutcome {
        suite_name: suite.name.clone(),
        all_passed,
        interrupted,
        state,
    })
}

async fn run_step(runner: &mut ApiRunner, ctx: &mut SuiteContext, config: &Config, step: &Step) {
    match step {
        Step::Check(p) => run_check(runner, ctx, p).await,

        Step::Login(p) => {
            let name = p.name.clone().unwrap_or_else(|| "Login".to_string());
            let path = ctx.substitute_vars(p.path.as_deref().unwrap_or(&config.login_path));
            let credentials = ctx.substitute_value(&p.credentials);
            let unresolved =
                first_unresolved(&path).or_else(|| first_unresolved(&credentials.to_string()));
            if let Some(var) = unresolved {
                runner.skip(&name, &format!("unresolved variable {}", var));
                return;
            }
            runner
                .login_with(&name, &path, &credentials, p.expect, p.severity)
                .await;
        }

        Step::Refresh(p) => {
            let name = p.name.clone().unwrap_or_else(|| "Token Refresh".to_string());
            let path = ctx.substitute_vars(p.path.as_deref().unwrap_or(&config.refresh_path));
            runner.refresh_with(&name, &path, p.severity).await;
        }

        Step::Preflight(p) => {
            let path = ctx.substitute_vars(&p.path);
            let name = p
                .name
                .clone()
                .unwrap_or_else(|| format!("CORS Preflight {}", path));
            runner
                .preflight(
                    &name,
                    &path,
                    &p.origin,
                    &p.request_method,
                    &p.request_headers,
                    p.severity,
                )
                .await;
        }

        Step::File(p) => {
            let rel = ctx.substitute_vars(&p.path);
            let name = p.name.clone().unwrap_or_else(|| format!("File {}", rel));
            if let Some(var) = first_unresolved(&rel) {
                runner.skip(&name, &format!("unresolved variable {}", var));
                return;
            }
            let path = ctx.resolve_path(&rel);
            let result = match files::inspect_file(&path, p) {
                Ok(details) => TestResult::new(&name, true, &details),
                Err(e) => TestResult::new(&name, false, &format!("{:#}", e)),
            };
            runner.record(result.with_severity(p.severity));
        }
    }
}

async fn run_check(runner: &mut ApiRunner, ctx: &mut SuiteContext, p: &CheckParams) {
    let path = ctx.substitute_vars(&p.path);
    let body = p.body.as_ref().map(|b| ctx.substitute_value(b));
    let name = p
        .name
        .clone()
        .unwrap_or_else(|| format!("{} {}", p.method, path));

    let unresolved = first_unresolved(&path)
        .or_else(|| body.as_ref().and_then(|b| first_unresolved(&b.to_string())));
    if let Some(var) = unresolved {
        runner.skip(&name, &format!("unresolved variable {}", var));
        return;
    }

    if p.auth && p.requires_token && !runner.has_token() {
        runner.skip(&name, "no auth token (login failed or was not run)");
        return;
    }

    let mut req = CheckRequest::new(p.method, &path, p.expect)
        .named(&name)
        .body(body)
        .auth(p.auth)
        .severity(p.severity);
    if let Some(status) = p.expect_not {
        req = req.expect_not(status);
    }

    let mut pointers: Vec<&String> = p.json.keys().collect();
    pointers.sort();
    for pointer in pointers {
        req = req.expect_json(pointer, ctx.substitute_value(&p.json[pointer]));
    }
    for pointer in &p.has {
        req = req.expect_present(pointer);
    }

    let outcome = runner.check_request(&req).await;
    if outcome.success && !p.save.is_empty() {
        for missing in ctx.capture(&outcome.body, &p.save) {
            log::warn!("'{}' did not return a value for '{}'", name, missing);
        }
    }
}
