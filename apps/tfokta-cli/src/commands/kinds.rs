//! Kinds command - List the built-in resource kinds

use clap::Args;
use serde::Serialize;

use tfokta_runtime::{kinds, ResourceDescriptor};

use crate::error::CliResult;

/// Arguments for the kinds command
#[derive(Args, Debug)]
pub struct KindsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct KindSummary {
    name: &'static str,
    oie_only: bool,
    updatable: bool,
    import_key: String,
    lock: Option<&'static str>,
}

impl From<&ResourceDescriptor> for KindSummary {
    fn from(descriptor: &ResourceDescriptor) -> Self {
        let import_key = match &descriptor.import {
            Some(spec) => spec
                .parent_fields
                .iter()
                .map(|field| format!("<{field}>"))
                .chain(std::iter::once("<id>".to_string()))
                .collect::<Vec<_>>()
                .join("/"),
            None => "-".to_string(),
        };
        Self {
            name: descriptor.name,
            oie_only: descriptor.oie_only.is_some(),
            updatable: descriptor.update.is_some(),
            import_key,
            lock: descriptor.lock,
        }
    }
}

fn summaries() -> Vec<KindSummary> {
    let mut summaries: Vec<KindSummary> = kinds::all().iter().map(KindSummary::from).collect();
    summaries.sort_by_key(|s| s.name);
    summaries
}

/// Execute the kinds command
pub fn execute(args: KindsArgs) -> CliResult<()> {
    let summaries = summaries();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("  {:<32} {:<10} {:<10} IMPORT KEY", "KIND", "OIE ONLY", "UPDATE");
    for summary in &summaries {
        println!(
            "  {:<32} {:<10} {:<10} {}",
            summary.name,
            if summary.oie_only { "yes" } else { "no" },
            if summary.updatable { "in place" } else { "replace" },
            summary.import_key
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summaries() {
        let summaries = summaries();
        let scope = summaries
            .iter()
            .find(|s| s.name == "okta_auth_server_scope")
            .unwrap();
        assert_eq!(scope.import_key, "<auth_server_id>/<id>");
        assert!(!scope.oie_only);

        let link = summaries
            .iter()
            .find(|s| s.name == "okta_link_definition")
            .unwrap();
        assert!(!link.updatable);
        assert_eq!(link.lock, Some("linked-object-definitions"));
    }
}
