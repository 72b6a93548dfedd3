//! Scenario runner
//!
//! Walks a scenario's steps in order, threading the session through the
//! executor. A step whose dependencies are not met is never issued and
//! leaves no trace in the ledger.

use serde_json::Value;

use super::config::{CheckStep, Requires, Scenario, Step};
use super::template::{value_to_var, Variables};
use crate::common::config::AuthFields;
use crate::executor::{Check, CheckOutcome, Executor};
use crate::ledger::{extract_credentials, Ledger, SessionState, Summary};
use crate::report;

/// Mutable state of one run, owned by the run alone
#[derive(Debug, Default)]
pub struct RunContext {
    pub session: SessionState,
    pub ledger: Ledger,
    pub vars: Variables,
}

impl RunContext {
    pub fn new(vars: Variables) -> Self {
        Self {
            session: SessionState::new(),
            ledger: Ledger::new(),
            vars,
        }
    }
}

/// Why a step was not issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoSession,
    IdentityMismatch { field: String },
    Unbound { var: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoSession => write!(f, "no session token"),
            SkipReason::IdentityMismatch { field } => {
                write!(f, "identity '{}' does not match", field)
            }
            SkipReason::Unbound { var } => write!(f, "'{}' is not bound", var),
        }
    }
}

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunReport {
    pub session: SessionState,
    pub ledger: Ledger,
    pub summary: Summary,
    /// Set when authentication failed and the remaining steps were dropped
    pub aborted: bool,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.summary.overall_pass && !self.aborted
    }

    /// Process exit code: 0 on a passing run, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }
}

/// Drives scenarios through an executor
pub struct Runner {
    executor: Executor,
    auth: AuthFields,
    snippet_chars: usize,
}

impl Runner {
    pub fn new(executor: Executor, auth: AuthFields, snippet_chars: usize) -> Self {
        Self {
            executor,
            auth,
            snippet_chars,
        }
    }

    /// Run every step of a scenario and summarize
    pub async fn run(&self, scenario: &Scenario, vars: Variables) -> RunReport {
        report::scenario_header(&scenario.name, scenario.description.as_deref());
        tracing::info!(
            scenario = %scenario.name,
            target = %self.executor.target().base_url,
            steps = scenario.steps.len(),
            "Starting run"
        );

        let mut ctx = RunContext::new(vars);
        let mut aborted = false;

        for step in &scenario.steps {
            match step {
                Step::Check(check) => {
                    self.run_check(&mut ctx, check).await;
                }
                Step::Authenticate { attempts } => {
                    if !self.authenticate(&mut ctx, attempts).await {
                        report::notice(
                            "All authentication attempts failed, cannot proceed with authenticated checks",
                        );
                        tracing::warn!("Authentication failed, skipping remaining steps");
                        aborted = true;
                        break;
                    }
                }
            }
        }

        let summary = ctx.ledger.summarize(self.snippet_chars);
        let counters = ctx.ledger.counters();
        tracing::info!(
            attempted = counters.attempted,
            passed = counters.passed,
            aborted,
            "Run finished"
        );

        RunReport {
            session: ctx.session,
            ledger: ctx.ledger,
            summary,
            aborted,
        }
    }

    /// Try each attempt until one yields a session
    async fn authenticate(&self, ctx: &mut RunContext, attempts: &[CheckStep]) -> bool {
        for attempt in attempts {
            let Some(outcome) = self.run_check(ctx, attempt).await else {
                continue;
            };
            if !outcome.success {
                continue;
            }
            if extract_credentials(&outcome.response, &self.auth).is_some() {
                tracing::info!(step = %attempt.name, "Session established");
                return true;
            }
            tracing::warn!(
                step = %attempt.name,
                token_field = %self.auth.token_field,
                identity_field = %self.auth.identity_field,
                "Response did not carry a session"
            );
        }
        false
    }

    /// Issue one check step if its dependencies hold.
    ///
    /// Returns `None` when the step was skipped.
    async fn run_check(&self, ctx: &mut RunContext, step: &CheckStep) -> Option<CheckOutcome> {
        if let Err(reason) = gate(ctx, step) {
            tracing::info!(step = %step.name, reason = %reason, "Step skipped");
            match (&reason, &step.on_missing) {
                (SkipReason::Unbound { .. }, Some(message)) => report::notice(message),
                _ => report::step_skipped(&step.name, &reason.to_string()),
            }
            return None;
        }

        let check = materialize(step, &ctx.vars);
        let outcome = self
            .executor
            .execute(&ctx.session, &mut ctx.ledger, &check)
            .await;

        if outcome.success {
            if ctx.session.adopt_from_response(&outcome.response, &self.auth) {
                tracing::debug!(step = %step.name, "Session adopted from response");
            }
            capture(step, &outcome.response, &mut ctx.vars);
        }

        Some(outcome)
    }
}

/// Check a step's session, identity and variable dependencies
pub fn gate(ctx: &RunContext, step: &CheckStep) -> Result<(), SkipReason> {
    if step.requires == Requires::Session && !ctx.session.is_authenticated() {
        return Err(SkipReason::NoSession);
    }

    if let Some(predicate) = &step.when {
        if !predicate.matches(&ctx.session) {
            return Err(SkipReason::IdentityMismatch {
                field: predicate.field.clone(),
            });
        }
    }

    if let Some(var) = step.needs.iter().find(|v| !ctx.vars.contains(v)) {
        return Err(SkipReason::Unbound { var: var.clone() });
    }

    Ok(())
}

/// Turn a scenario step into a concrete check with variables substituted
pub fn materialize(step: &CheckStep, vars: &Variables) -> Check {
    let mut check = Check::new(
        vars.substitute(&step.name),
        step.method,
        vars.substitute(&step.path),
        step.expect,
    );
    check.body = step.body.as_ref().map(|b| vars.substitute_value(b));
    check.file = step.file.as_ref().map(|f| f.to_payload());
    check.headers = step
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), vars.substitute(v)))
        .collect();
    check.form = step.form;
    check
}

/// Bind variables from a successful response
fn capture(step: &CheckStep, response: &Value, vars: &mut Variables) {
    for (var, pointer) in &step.capture {
        match response.pointer(pointer) {
            Some(value) if !value.is_null() => {
                tracing::debug!(step = %step.name, var = %var, "Captured variable");
                vars.set(var.clone(), value_to_var(value));
            }
            _ => {
                tracing::debug!(step = %step.name, var = %var, pointer = %pointer, "Nothing to capture");
            }
        }
    }
}
