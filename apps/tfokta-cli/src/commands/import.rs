//! Import command - Import a resource and print its attributes

use clap::Args;
use serde_json::json;

use crate::error::CliResult;
use crate::session::Session;

/// Arguments for the import command
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Resource kind, e.g. okta_auth_server_scope
    pub kind: String,

    /// Import key, `<id>` or `<parent>/<id>`
    pub key: String,
}

/// Execute the import command
pub async fn execute(args: ImportArgs) -> CliResult<()> {
    let session = Session::from_env()?;
    let instance = session
        .runtime
        .import(&session.ctx, &args.kind, &args.key)
        .await?;

    let output = json!({
        "kind": args.kind,
        "id": instance.id,
        "attributes": instance.desired,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
