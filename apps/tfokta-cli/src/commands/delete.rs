//! Delete command - Delete resources by import key
//!
//! Each key is imported first so that delete hooks see the observed state
//! (system flags, bound apps, lifecycle status). Keys are processed with at
//! most `OKTA_PARALLELISM` operations in flight.

use clap::Args;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::info;

use tfokta_core::{CallContext, OktaResult};
use tfokta_runtime::ResourceRuntime;

use crate::error::{CliError, CliResult};
use crate::session::Session;

/// Arguments for the delete command
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Resource kind, e.g. okta_link_definition
    pub kind: String,

    /// Import keys of the resources to delete
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    Deleted,
    AlreadyGone,
    Failed,
}

#[derive(Debug, Serialize)]
struct DeleteResult {
    key: String,
    outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn delete_one(runtime: &ResourceRuntime, ctx: &CallContext, kind: &str, key: &str) -> OktaResult<Outcome> {
    let instance = match runtime.import(ctx, kind, key).await {
        Ok(instance) => instance,
        Err(e) if e.is_not_found() => return Ok(Outcome::AlreadyGone),
        Err(e) => return Err(e),
    };
    runtime.delete(ctx, kind, instance).await?;
    info!(kind, key, "Deleted");
    Ok(Outcome::Deleted)
}

async fn delete_all(
    runtime: &ResourceRuntime,
    ctx: &CallContext,
    kind: &str,
    keys: &[String],
    parallelism: usize,
) -> Vec<DeleteResult> {
    stream::iter(keys)
        .map(|key| async move {
            match delete_one(runtime, ctx, kind, key).await {
                Ok(outcome) => DeleteResult {
                    key: key.clone(),
                    outcome,
                    error: None,
                },
                Err(e) => DeleteResult {
                    key: key.clone(),
                    outcome: Outcome::Failed,
                    error: Some(e.to_string()),
                },
            }
        })
        .buffered(parallelism.max(1))
        .collect()
        .await
}

/// Execute the delete command
pub async fn execute(args: DeleteArgs) -> CliResult<()> {
    let session = Session::from_env()?;
    // reject unknown kinds before touching the network
    session.runtime.descriptor(&args.kind)?;

    let parallelism = session.config.throughput().parallelism as usize;
    let results = delete_all(&session.runtime, &session.ctx, &args.kind, &args.keys, parallelism).await;

    if session.ctx.is_cancelled() {
        return Err(CliError::Interrupted);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            match (&result.outcome, &result.error) {
                (Outcome::Deleted, _) => println!("  ✓ {} deleted", result.key),
                (Outcome::AlreadyGone, _) => println!("  - {} already gone", result.key),
                (Outcome::Failed, error) => {
                    println!("  ✗ {} {}", result.key, error.as_deref().unwrap_or("failed"))
                }
            }
        }
    }

    let failed = results.iter().filter(|r| r.outcome == Outcome::Failed).count();
    if failed > 0 {
        return Err(CliError::Partial {
            failed,
            total: results.len(),
        });
    }
    Ok(())
}
