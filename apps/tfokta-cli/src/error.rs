//! CLI error types and exit codes

use thiserror::Error;

use tfokta_core::OktaError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 2: Authentication failed or feature unavailable on this org
/// - 3: Network or rate-limit error
/// - 4: Validation error
/// - 5: Server error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{failed} of {total} operations failed")]
    Partial { failed: usize, total: usize },

    #[error(transparent)]
    Okta(#[from] OktaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Interrupted")]
    Interrupted,
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation(_) => 4,
            CliError::Partial { .. } => 1,
            CliError::Json(_) => 1,
            CliError::Interrupted => 130,
            CliError::Okta(e) => okta_exit_code(e),
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            CliError::Okta(OktaError::InvalidConfiguration { .. }) => Some(
                "Set OKTA_ORG_NAME (or OKTA_ORG_URL) and one of OKTA_API_TOKEN, OKTA_ACCESS_TOKEN or OKTA_API_CLIENT_ID with OKTA_API_PRIVATE_KEY."
                    .to_string(),
            ),
            CliError::Okta(OktaError::AuthFailure { .. }) => {
                Some("Check the credentials with 'tfokta doctor'.".to_string())
            }
            CliError::Okta(OktaError::OieOnlyUnsupported { documentation, .. }) => {
                Some(format!("See {documentation}"))
            }
            CliError::Okta(OktaError::RateLimited { .. }) => {
                Some("Lower OKTA_PARALLELISM or OKTA_MAX_API_CAPACITY and try again.".to_string())
            }
            _ => None,
        }
    }
}

fn okta_exit_code(error: &OktaError) -> i32 {
    match error {
        OktaError::InvalidConfiguration { .. } | OktaError::Key { .. } => 1,
        OktaError::AuthFailure { .. } | OktaError::OieOnlyUnsupported { .. } => 2,
        OktaError::Transient { .. } | OktaError::RateLimited { .. } | OktaError::Timeout { .. } => 3,
        OktaError::InvalidInput { .. }
        | OktaError::Validation { .. }
        | OktaError::NotFound { .. }
        | OktaError::Conflict { .. } => 4,
        OktaError::RetriesExhausted { .. } => match error.status() {
            Some(status) if status >= 500 => 5,
            _ => 3,
        },
        OktaError::Fatal { .. } => match error.status() {
            Some(status) if status >= 500 => 5,
            _ => 1,
        },
        OktaError::Cancelled => 130,
        OktaError::Serialization { .. } | OktaError::Internal { .. } => 1,
    }
}
