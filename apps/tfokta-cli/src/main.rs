//! tfokta CLI - operator tooling for the Okta reconciliation core
//!
//! This CLI enables operators to:
//! - Diagnose configuration, credentials and org capability
//! - List the built-in resource kinds
//! - Import a resource by key and print its attributes
//! - Delete resources by key, in parallel

use clap::{Parser, Subcommand};

mod commands;
mod error;
mod session;

use error::CliResult;

/// tfokta CLI - Okta resource reconciliation
#[derive(Parser)]
#[command(name = "tfokta")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose configuration, credentials and org capability
    Doctor(commands::doctor::DoctorArgs),

    /// List the built-in resource kinds
    Kinds(commands::kinds::KindsArgs),

    /// Import a resource and print its attributes
    Import(commands::import::ImportArgs),

    /// Delete resources by import key
    Delete(commands::delete::DeleteArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Doctor(args) => commands::doctor::execute(args).await,
        Commands::Kinds(args) => commands::kinds::execute(args),
        Commands::Import(args) => commands::import::execute(args).await,
        Commands::Delete(args) => commands::delete::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_delete_many() {
        let cli = Cli::try_parse_from(["tfokta", "delete", "okta_link_definition", "manager", "mentor"]).unwrap();
        match cli.command {
            Commands::Delete(args) => {
                assert_eq!(args.kind, "okta_link_definition");
                assert_eq!(args.keys, vec!["manager", "mentor"]);
            }
            _ => panic!("expected delete"),
        }
    }
}
