//! Classic vs. Identity Engine detection.

use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use tfokta_core::{CallContext, OktaResult, OrgCapability};

use crate::http::{ApiRequest, OktaClient};

pub const ORGANIZATION_PATH: &str = "/.well-known/okta-organization";

#[derive(Debug, Deserialize)]
struct OrganizationInfo {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    pipeline: Option<String>,
}

/// One-shot org capability probe.
///
/// The verdict is fetched on first use and cached for the life of the probe.
#[derive(Debug, Default)]
pub struct CapabilityProbe {
    verdict: OnceCell<OrgCapability>,
}

impl CapabilityProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe with a verdict fixed by configuration.
    pub fn fixed(capability: OrgCapability) -> Self {
        Self {
            verdict: OnceCell::new_with(Some(capability)),
        }
    }

    /// Probe honouring the `classic_org` override of the client's configuration.
    pub fn for_client(client: &OktaClient) -> Self {
        match client.config().classic_org() {
            Some(true) => Self::fixed(OrgCapability::Classic),
            Some(false) => Self::fixed(OrgCapability::Oie),
            None => Self::new(),
        }
    }

    /// Cached verdict, if already known.
    pub fn cached(&self) -> Option<OrgCapability> {
        self.verdict.get().copied()
    }

    /// The org capability, probing on first call.
    pub async fn capability(
        &self,
        ctx: &CallContext,
        client: &OktaClient,
    ) -> OktaResult<OrgCapability> {
        self.verdict
            .get_or_try_init(|| probe(ctx, client))
            .await
            .copied()
    }
}

async fn probe(ctx: &CallContext, client: &OktaClient) -> OktaResult<OrgCapability> {
    let info: OrganizationInfo = client
        .execute(ctx, &ApiRequest::get(ORGANIZATION_PATH))
        .await?
        .body;

    let capability = match info.pipeline.as_deref() {
        Some("idx") => OrgCapability::Oie,
        Some("v1") => OrgCapability::Classic,
        other => {
            warn!(pipeline = ?other, "Unrecognised org pipeline, assuming Classic");
            OrgCapability::Classic
        }
    };
    info!(org_id = ?info.id, capability = %capability, "Detected org capability");
    Ok(capability)
}
