use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use api_probe::{report, runner, suites, utils};

#[derive(Parser)]
#[command(name = "api-probe")]
#[command(version = "0.1.0")]
#[command(about = "HTTP API smoke and regression test runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a suite file, a directory of suites, or a built-in suite by name
    Run {
        /// Suite file, directory, or built-in suite name
        target: String,

        /// API server root (overrides the suite's baseUrl)
        #[arg(short, long)]
        base_url: Option<String>,

        /// Suite variable as name=value. Can be specified multiple times.
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// Bearer token to use before any login step
        #[arg(long)]
        token: Option<String>,

        /// Per-request timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,

        /// Directory that file checks are resolved against
        #[arg(long)]
        root: Option<PathBuf>,

        /// Output directory for reports
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Write JSON and JUnit reports
        #[arg(long, default_value = "false")]
        report: bool,
    },

    /// List built-in suites
    Suites,

    /// Generate report from saved results
    Report {
        /// Path to api-probe-results.json
        results: PathBuf,

        /// Output format (json, junit)
        #[arg(short, long, default_value = "junit")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let code = match execute(cli.command).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            println!("\n{} Unexpected error: {:#}", "💥".red(), e);
            1
        }
    };
    std::process::exit(code);
}

/// Runs one subcommand; `Ok(false)` means a check failed or the run was interrupted
async fn execute(command: Commands) -> anyhow::Result<bool> {
    match command {
        Commands::Run {
            target,
            base_url,
            vars,
            token,
            timeout,
            root,
            output,
            report,
        } => {
            let mut config = utils::Config::from_env();
            if let Some(url) = base_url {
                config.base_url = url;
                config.base_url_explicit = true;
            }
            if let Some(secs) = timeout {
                config.timeout_secs = secs;
            }
            if let Some(root) = root {
                config.root_dir = root;
            }
            config.output_dir = output;

            let options = runner::RunOptions {
                config,
                vars: vars.into_iter().collect(),
                token,
                report,
            };

            // Checked between steps; the in-flight request is allowed to finish
            let interrupt = Arc::new(AtomicBool::new(false));
            let interrupt_handler = interrupt.clone();
            ctrlc::set_handler(move || {
                println!("\n{} Stopping after the current check...", "⏹️ ".yellow());
                interrupt_handler.store(true, Ordering::SeqCst);
            })?;

            let outcomes = runner::run_target(&target, &options, &interrupt).await?;

            if outcomes.len() > 1 {
                println!("\n{}", "=".repeat(60));
                for outcome in &outcomes {
                    let mark = if outcome.all_passed {
                        "✅".green()
                    } else {
                        "❌".red()
                    };
                    println!(
                        "{} {} ({}/{})",
                        mark,
                        outcome.suite_name,
                        outcome.state.tests_passed,
                        outcome.state.tests_run
                    );
                }
            }

            Ok(outcomes.iter().all(|o| o.all_passed))
        }

        Commands::Suites => {
            println!("{} Built-in suites:", "📋".blue());
            for name in suites::names() {
                let description = suites::builtin(name)
                    .and_then(|content| api_probe::parser::parse_suite_content(content, name).ok())
                    .and_then(|suite| suite.description)
                    .unwrap_or_default();
                println!("  {} {}", name.cyan(), description.dimmed());
            }
            Ok(true)
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref())?;
            Ok(true)
        }
    }
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_must_be_positive() {
        assert!(Cli::try_parse_from(["api-probe", "run", "backend", "--timeout", "0"]).is_err());

        let cli = Cli::try_parse_from(["api-probe", "run", "backend", "--timeout", "3"]).unwrap();
        match cli.command {
            Commands::Run { timeout, .. } => assert_eq!(timeout, Some(3)),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_var_flags() {
        let cli = Cli::try_parse_from([
            "api-probe",
            "run",
            "blog",
            "--var",
            "admin_email=ops@example.com",
            "--var",
            "note=a=b",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { vars, .. } => assert_eq!(
                vars,
                vec![
                    ("admin_email".to_string(), "ops@example.com".to_string()),
                    ("note".to_string(), "a=b".to_string()),
                ]
            ),
            _ => panic!("expected run"),
        }
        assert!(parse_var("no-equals").is_err());
    }
}
