//! Configuration, logging and runtime setup shared by the commands.

use std::sync::Arc;

use tracing::debug;

use tfokta_core::logging::init_tracing;
use tfokta_core::{CallContext, ProviderConfig};
use tfokta_runtime::{ClientBundle, ResourceRuntime};

use crate::error::CliResult;

/// Everything a command needs to talk to the org.
pub struct Session {
    pub config: ProviderConfig,
    pub runtime: ResourceRuntime,
    pub ctx: CallContext,
}

impl Session {
    /// Load `OKTA_*` configuration, install logging and build the runtime.
    pub fn from_env() -> CliResult<Self> {
        let config = ProviderConfig::from_env()?;
        init_tracing(config.log_level());
        debug!(org_url = %config.org_url(), auth = config.auth().name(), "Loaded configuration");

        let bundle = Arc::new(ClientBundle::new(config.clone())?);
        Ok(Self {
            runtime: ResourceRuntime::with_default_kinds(bundle),
            ctx: interruptible_context(),
            config,
        })
    }
}

/// Context cancelled on Ctrl-C.
pub fn interruptible_context() -> CallContext {
    let ctx = CallContext::new();
    let on_signal = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });
    ctx
}
