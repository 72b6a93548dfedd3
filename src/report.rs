//! Console report
//!
//! Per-check progress lines are printed as checks run. The summary block
//! is rendered to a string so the caller decides where it goes.

use colored::Colorize;
use std::fmt::Write;

use crate::common::truncate_snippet;
use crate::ledger::{Ledger, ResponseCapture};

const RULE_WIDTH: usize = 50;

/// Print the header line for a scenario
pub fn scenario_header(name: &str, description: Option<&str>) {
    println!("\n{} {}", "Running Scenario:".blue().bold(), name.white().bold());
    if let Some(desc) = description {
        println!("  {}", desc.dimmed());
    }
}

/// Announce a check before it is sent
pub fn check_started(name: &str) {
    println!("\n🔍 Testing {}...", name);
}

pub fn check_passed(status: u16) {
    println!("{} Passed - Status: {}", "✓".green(), status);
}

pub fn check_status_mismatch(expected: u16, actual: u16, snippet: &str) {
    println!(
        "{} Failed - Expected {}, got {}",
        "✗".red(),
        expected,
        actual
    );
    println!("Response: {}", snippet.dimmed());
}

pub fn check_transport_error(error: &str) {
    println!("{} Failed - Error: {}", "✗".red(), error);
}

/// A step that was not issued
pub fn step_skipped(name: &str, reason: &str) {
    println!("\n{} Skipping {}: {}", "-".yellow(), name, reason.dimmed());
}

/// A notice that stands in for an unissued step
pub fn notice(message: &str) {
    println!("{} {}", "✗".red(), message);
}

/// Render the final summary block
pub fn summary_block(ledger: &Ledger, snippet_chars: usize) -> String {
    let counters = ledger.counters();
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", rule);
    let _ = writeln!(
        out,
        "📊 API TEST SUMMARY: {}/{} tests passed",
        counters.passed, counters.attempted
    );
    let _ = writeln!(out, "{}", rule);

    let mut failures = ledger.failures().peekable();
    if failures.peek().is_some() {
        let _ = writeln!(out, "\nFAILED TESTS:");
        for result in failures {
            let _ = writeln!(
                out,
                "  - {} ({} {})",
                result.name, result.method, result.endpoint
            );
            let actual = result
                .actual_status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "Error".to_string());
            let _ = writeln!(
                out,
                "    Expected: {}, Got: {}",
                result.expected_status, actual
            );
            if let Some(error) = &result.error {
                let _ = writeln!(out, "    Error: {}", error);
            } else if let Some(response) = &result.response {
                let _ = writeln!(
                    out,
                    "    Response: {}",
                    truncate_snippet(&render_response(response), snippet_chars)
                );
            }
        }
    }

    out
}

fn render_response(response: &ResponseCapture) -> String {
    serde_json::to_string_pretty(&response.to_value()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::ledger::TestResult;
    use serde_json::json;

    #[test]
    fn test_summary_all_passed() {
        let mut ledger = Ledger::new();
        ledger.record(TestResult::completed(
            "Health Check",
            "../health",
            Method::Get,
            200,
            200,
            ResponseCapture::Json(json!({"status": "ok"})),
        ));
        let block = summary_block(&ledger, 200);
        assert!(block.contains("API TEST SUMMARY: 1/1 tests passed"));
        assert!(!block.contains("FAILED TESTS"));
    }

    #[test]
    fn test_summary_lists_failures_in_order() {
        let mut ledger = Ledger::new();
        ledger.record(TestResult::completed(
            "Login",
            "auth/login",
            Method::Post,
            200,
            401,
            ResponseCapture::Json(json!({"detail": "Invalid credentials"})),
        ));
        ledger.record(TestResult::completed(
            "Get States",
            "states",
            Method::Get,
            200,
            200,
            ResponseCapture::Json(json!([])),
        ));
        ledger.record(TestResult::transport_failure(
            "Get Dashboard",
            "dashboard",
            Method::Get,
            200,
            "Connection failed: refused".to_string(),
        ));

        let block = summary_block(&ledger, 200);
        assert!(block.contains("1/3 tests passed"));
        assert!(block.contains("  - Login (POST auth/login)"));
        assert!(block.contains("    Expected: 200, Got: 401"));
        assert!(block.contains("Invalid credentials"));
        assert!(block.contains("    Expected: 200, Got: Error"));
        assert!(block.contains("    Error: Connection failed: refused"));
        assert!(!block.contains("Get States"));

        let login = block.find("Login").unwrap();
        let dashboard = block.find("Get Dashboard").unwrap();
        assert!(login < dashboard);
    }

    #[test]
    fn test_summary_truncates_response() {
        let mut ledger = Ledger::new();
        ledger.record(TestResult::completed(
            "Get Courses",
            "courses",
            Method::Get,
            200,
            500,
            ResponseCapture::Json(json!({"trace": "x".repeat(500)})),
        ));
        let block = summary_block(&ledger, 200);
        let marker = "    Response: ";
        let start = block.find(marker).unwrap() + marker.len();
        let snippet = block[start..].trim_end();
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), 203);
    }
}
