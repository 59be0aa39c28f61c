//! Doctor command - Diagnose configuration, credentials and org capability

use clap::Args;
use serde::Serialize;

use tfokta_client::Signer;
use tfokta_core::{CallContext, OktaError, OrgCapability, ProviderConfig};
use tfokta_runtime::ClientBundle;

use crate::error::{CliError, CliResult};
use crate::session::interruptible_context;

const RESET: &str = "\x1b[0m";

/// Arguments for the doctor command
#[derive(Args, Debug)]
#[command(about = "Diagnose configuration, credentials and org capability")]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticStatus {
    Pass,
    Warn,
    Fail,
    Skip,
}

impl DiagnosticStatus {
    fn symbol(self) -> &'static str {
        match self {
            DiagnosticStatus::Pass => "✓",
            DiagnosticStatus::Warn => "!",
            DiagnosticStatus::Fail => "✗",
            DiagnosticStatus::Skip => "-",
        }
    }

    fn color(self) -> &'static str {
        match self {
            DiagnosticStatus::Pass => "\x1b[32m",
            DiagnosticStatus::Warn => "\x1b[33m",
            DiagnosticStatus::Fail => "\x1b[31m",
            DiagnosticStatus::Skip => "\x1b[90m",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticCheck {
    pub name: &'static str,
    pub status: DiagnosticStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl DiagnosticCheck {
    fn pass(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            status: DiagnosticStatus::Pass,
            message: message.into(),
            suggestion: None,
        }
    }

    fn fail(name: &'static str, message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            name,
            status: DiagnosticStatus::Fail,
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    fn skip(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            status: DiagnosticStatus::Skip,
            message: message.into(),
            suggestion: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DiagnosticReport {
    pub checks: Vec<DiagnosticCheck>,
    pub overall_status: DiagnosticStatus,
    pub cli_version: &'static str,
    pub timestamp: String,
}

impl DiagnosticReport {
    fn new(checks: Vec<DiagnosticCheck>) -> Self {
        let overall_status = if checks.iter().any(|c| c.status == DiagnosticStatus::Fail) {
            DiagnosticStatus::Fail
        } else if checks.iter().any(|c| c.status == DiagnosticStatus::Warn) {
            DiagnosticStatus::Warn
        } else {
            DiagnosticStatus::Pass
        };
        Self {
            checks,
            overall_status,
            cli_version: env!("CARGO_PKG_VERSION"),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn fail_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == DiagnosticStatus::Fail)
            .count()
    }
}

fn check_configuration(config: &Result<ProviderConfig, OktaError>) -> DiagnosticCheck {
    match config {
        Ok(config) => DiagnosticCheck::pass(
            "configuration",
            format!("{} using {}", config.org_url(), config.auth().name()),
        ),
        Err(e) => DiagnosticCheck::fail(
            "configuration",
            e.to_string(),
            "Set OKTA_ORG_NAME and credentials in the environment",
        ),
    }
}

async fn check_credentials(bundle: &ClientBundle, ctx: &CallContext) -> DiagnosticCheck {
    match bundle.client().signer().credential(ctx).await {
        Ok(_) => DiagnosticCheck::pass(
            "credentials",
            format!("{} credential available", bundle.client().signer().mode()),
        ),
        Err(e) => DiagnosticCheck::fail(
            "credentials",
            e.to_string(),
            "Check the token, or the client id, key and scopes",
        ),
    }
}

async fn check_capability(bundle: &ClientBundle, ctx: &CallContext) -> DiagnosticCheck {
    match bundle.capability(ctx).await {
        Ok(OrgCapability::Oie) => DiagnosticCheck::pass("org_capability", "Okta Identity Engine"),
        Ok(OrgCapability::Classic) => DiagnosticCheck {
            name: "org_capability",
            status: DiagnosticStatus::Warn,
            message: "Classic engine".to_string(),
            suggestion: Some("Identity Engine kinds are unavailable on this org".to_string()),
        },
        Err(e) => DiagnosticCheck::fail(
            "org_capability",
            e.to_string(),
            "Check network access to the org URL",
        ),
    }
}

fn check_rate_limits(bundle: &ClientBundle) -> DiagnosticCheck {
    let budgets = bundle.client().rate_limit_snapshot();
    if budgets.is_empty() {
        return DiagnosticCheck::skip("rate_limits", "No rate-limit headers seen yet");
    }
    let summary = budgets
        .iter()
        .map(|(family, budget)| match (budget.remaining, budget.limit) {
            (Some(remaining), Some(limit)) => format!("{family} {remaining}/{limit}"),
            _ => format!("{family} unknown"),
        })
        .collect::<Vec<_>>()
        .join(", ");
    DiagnosticCheck::pass("rate_limits", summary)
}

async fn run_all_checks() -> DiagnosticReport {
    let config = ProviderConfig::from_env();
    let mut checks = vec![check_configuration(&config)];

    let bundle = config.and_then(ClientBundle::new);
    match bundle {
        Ok(bundle) => {
            let ctx = interruptible_context();
            let credentials = check_credentials(&bundle, &ctx).await;
            let credentials_ok = credentials.status == DiagnosticStatus::Pass;
            checks.push(credentials);

            if credentials_ok {
                checks.push(check_capability(&bundle, &ctx).await);
                checks.push(check_rate_limits(&bundle));
            } else {
                checks.push(DiagnosticCheck::skip("org_capability", "Skipped - credentials unavailable"));
                checks.push(DiagnosticCheck::skip("rate_limits", "Skipped - credentials unavailable"));
            }
        }
        Err(e) => {
            if checks.iter().all(|c| c.status == DiagnosticStatus::Pass) {
                checks.push(DiagnosticCheck::fail("client", e.to_string(), "Check OKTA_HTTP_PROXY"));
            }
            for name in ["credentials", "org_capability", "rate_limits"] {
                checks.push(DiagnosticCheck::skip(name, "Skipped - configuration failed"));
            }
        }
    }

    DiagnosticReport::new(checks)
}

fn print_report(report: &DiagnosticReport) {
    let use_color = std::env::var("NO_COLOR").is_err();

    println!();
    println!("tfokta doctor");
    println!("═══════════════════════════════════════════════════════");
    println!();

    for check in &report.checks {
        let status_display = if use_color {
            format!("{}{}{}", check.status.color(), check.status.symbol(), RESET)
        } else {
            check.status.symbol().to_string()
        };
        println!("  {:<16} {}  {}", check.name, status_display, check.message);

        if let Some(ref suggestion) = check.suggestion {
            println!("                      └─ {suggestion}");
        }
    }

    println!();
    println!("═══════════════════════════════════════════════════════");
    let overall = match report.overall_status {
        DiagnosticStatus::Fail => format!("{} check(s) failed", report.fail_count()),
        DiagnosticStatus::Warn => "Warnings detected".to_string(),
        _ => "All checks passed".to_string(),
    };
    println!("  Overall Status: {overall}");
    println!("  CLI Version: {}", report.cli_version);
    println!("  Checked at: {}", report.timestamp);
    println!();
}

/// Execute the doctor command
pub async fn execute(args: DoctorArgs) -> CliResult<()> {
    let report = run_all_checks().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall_status == DiagnosticStatus::Fail {
        return Err(CliError::Validation(
            "One or more diagnostic checks failed".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status() {
        let report = DiagnosticReport::new(vec![
            DiagnosticCheck::pass("a", "ok"),
            DiagnosticCheck::skip("b", "skipped"),
        ]);
        assert_eq!(report.overall_status, DiagnosticStatus::Pass);

        let report = DiagnosticReport::new(vec![
            DiagnosticCheck::pass("a", "ok"),
            DiagnosticCheck::fail("b", "broken", "fix it"),
        ]);
        assert_eq!(report.overall_status, DiagnosticStatus::Fail);
        assert_eq!(report.fail_count(), 1);
    }

    #[test]
    fn test_configuration_failure_reported() {
        let check = check_configuration(&Err(OktaError::invalid_config("org_name is required")));
        assert_eq!(check.status, DiagnosticStatus::Fail);
        assert!(check.message.contains("org_name"));
    }
}
