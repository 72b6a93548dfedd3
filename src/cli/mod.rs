//! CLI command handling
//!
//! Dispatches CLI commands and maps run verdicts to exit codes.

use colored::Colorize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::commands::{Commands, TargetArgs};
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::executor::{Check, Executor};
use crate::http::Method;
use crate::ledger::{Ledger, SessionState};
use crate::scenario::{builtin, Requires, Runner, Scenario, Step, Variables};

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run { scenario, target } => {
            let config = load_config(&target)?;
            let scenario = load_scenario(scenario.as_deref())?;

            let executor = Executor::from_config(&config)?;
            let runner = Runner::new(executor, config.auth.clone(), config.report.snippet_chars);
            let report = runner.run(&scenario, Variables::with_run_id()).await;

            println!("{}", report.summary.report);
            Ok(report.exit_code())
        }

        Commands::Check {
            path,
            method,
            expect,
            body,
            form,
            token,
            target,
        } => {
            let config = load_config(&target)?;
            let executor = Executor::from_config(&config)?;

            let check = adhoc_check(method, path, expect, body.as_deref(), form)?;

            let mut session = SessionState::new();
            if let Some(token) = token {
                session.adopt(token, Map::new());
            }

            let mut ledger = Ledger::new();
            let outcome = executor.execute(&session, &mut ledger, &check).await;
            if let Ok(pretty) = serde_json::to_string_pretty(&outcome.response) {
                println!("{}", pretty.dimmed());
            }

            let summary = ledger.summarize(config.report.snippet_chars);
            println!("{}", summary.report);
            Ok(if summary.overall_pass { 0 } else { 1 })
        }

        Commands::Show { scenario } => {
            let scenario = load_scenario(scenario.as_deref())?;
            print_scenario(&scenario);
            Ok(0)
        }
    }
}

/// Build a one-off check from `check` subcommand arguments
fn adhoc_check(
    method: Method,
    path: String,
    expect: u16,
    body: Option<&str>,
    form: bool,
) -> Result<Check> {
    if !method.carries_body() && (body.is_some() || form) {
        return Err(Error::Config(format!(
            "{} carries no body; drop --body/--form or use -X POST or PUT",
            method
        )));
    }

    let mut check = Check::new(format!("{} {}", method, path), method, path, expect);
    if let Some(body) = body {
        let value: Value = serde_json::from_str(body)?;
        check = check.with_body(value);
    }
    if form {
        check = check.as_form();
    }
    Ok(check)
}

/// Build the effective configuration: file, then environment, then flags
pub fn load_config(args: &TargetArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env()?;

    if let Some(url) = &args.base_url {
        config.set_base_url(url)?;
    }
    if let Some(timeout) = args.timeout {
        config.timeouts.request_secs = timeout;
    }

    tracing::debug!(base_url = %config.target.base_url, "Configuration loaded");
    Ok(config)
}

fn load_scenario(path: Option<&Path>) -> Result<Scenario> {
    match path {
        Some(path) => Scenario::load(path),
        None => builtin::driving_school(),
    }
}

fn print_scenario(scenario: &Scenario) {
    println!("{} {}", "Scenario:".blue().bold(), scenario.name.white().bold());
    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    let mut n = 0;
    for step in &scenario.steps {
        match step {
            Step::Check(check) => {
                n += 1;
                println!(
                    "  {:>2}. {} {} -> {}{}",
                    n,
                    check.method,
                    check.path,
                    check.expect,
                    step_tags(check.requires, check.when.is_some(), &check.needs).dimmed()
                );
                println!("      {}", check.name);
            }
            Step::Authenticate { attempts } => {
                println!("  {}", "authenticate (first success wins):".cyan());
                for attempt in attempts {
                    n += 1;
                    println!(
                        "  {:>2}. {} {} -> {}  [{}]",
                        n, attempt.method, attempt.path, attempt.expect, attempt.name
                    );
                }
            }
        }
    }
}

fn step_tags(requires: Requires, conditional: bool, needs: &[String]) -> String {
    let mut tags = Vec::new();
    if requires == Requires::Session {
        tags.push("session".to_string());
    }
    if conditional {
        tags.push("conditional".to_string());
    }
    if !needs.is_empty() {
        tags.push(format!("needs {}", needs.join(", ")));
    }
    if tags.is_empty() {
        String::new()
    } else {
        format!("  ({})", tags.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_tags() {
        assert_eq!(step_tags(Requires::None, false, &[]), "");
        assert_eq!(
            step_tags(Requires::Session, true, &["school_id".to_string()]),
            "  (session; conditional; needs school_id)"
        );
    }

    #[test]
    fn test_adhoc_check_rejects_body_without_payload_method() {
        let err = adhoc_check(Method::Get, "states".to_string(), 200, Some(r#"{"x":1}"#), false)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("GET carries no body"));

        let err = adhoc_check(Method::Delete, "documents/1".to_string(), 200, None, true)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_adhoc_check_body_must_be_json() {
        let err = adhoc_check(Method::Post, "enroll".to_string(), 200, Some("{not json"), false)
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_adhoc_check_builds_form_post() {
        let check = adhoc_check(
            Method::Post,
            "auth/login".to_string(),
            200,
            Some(r#"{"email":"a@b.c"}"#),
            true,
        )
        .unwrap();
        assert_eq!(check.name, "POST auth/login");
        assert!(check.form);
        assert_eq!(check.body, Some(serde_json::json!({"email": "a@b.c"})));
    }

    #[test]
    fn test_load_config_flag_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[target]\nbase_url = \"http://from-file:1\"\n[timeouts]\nrequest_secs = 5\n",
        )
        .unwrap();

        let args = TargetArgs {
            base_url: Some("http://from-flag:2/".to_string()),
            timeout: Some(0),
            config: Some(path),
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.target.base_url, "http://from-flag:2");
        assert_eq!(config.timeouts.request(), None);
    }
}
