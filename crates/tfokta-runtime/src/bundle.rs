//! Shared state of every CRUD call against one org.

use std::fmt;

use dashmap::DashMap;
use tracing::debug;

use tfokta_client::{CapabilityProbe, OktaClient};
use tfokta_core::{CallContext, OktaError, OktaResult, OrgCapability, ProviderConfig};

use crate::defaults;
use crate::locks::NamedLockRegistry;
use crate::model::Policy;

/// Client, capability verdict, named locks and default-policy cache.
///
/// This is the only state shared between concurrent hook invocations.
pub struct ClientBundle {
    client: OktaClient,
    capability: CapabilityProbe,
    locks: NamedLockRegistry,
    default_policies: DashMap<String, Policy>,
}

impl fmt::Debug for ClientBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBundle")
            .field("org_url", &self.client.config().org_url().as_str())
            .field("capability", &self.capability.cached())
            .field("locks", &self.locks.names())
            .finish_non_exhaustive()
    }
}

impl ClientBundle {
    /// Build the client and bundle from a validated configuration.
    pub fn new(config: ProviderConfig) -> OktaResult<Self> {
        Ok(Self::from_client(OktaClient::new(config)?))
    }

    pub fn from_client(client: OktaClient) -> Self {
        let capability = CapabilityProbe::for_client(&client);
        Self::with_capability(client, capability)
    }

    pub fn with_capability(client: OktaClient, capability: CapabilityProbe) -> Self {
        Self {
            client,
            capability,
            locks: NamedLockRegistry::new(),
            default_policies: DashMap::new(),
        }
    }

    pub fn client(&self) -> &OktaClient {
        &self.client
    }

    pub fn config(&self) -> &ProviderConfig {
        self.client.config()
    }

    pub fn locks(&self) -> &NamedLockRegistry {
        &self.locks
    }

    /// Classic or OIE, probed once per bundle.
    pub async fn capability(&self, ctx: &CallContext) -> OktaResult<OrgCapability> {
        self.capability.capability(ctx, &self.client).await
    }

    pub async fn is_oie(&self, ctx: &CallContext) -> OktaResult<bool> {
        Ok(self.capability(ctx).await?.is_oie())
    }

    /// Fail with `OieOnlyUnsupported` unless the org runs Identity Engine.
    pub async fn require_oie(
        &self,
        ctx: &CallContext,
        resource: &str,
        documentation: &str,
    ) -> OktaResult<()> {
        if self.is_oie(ctx).await? {
            return Ok(());
        }
        debug!(resource, "Rejecting Identity Engine resource on Classic org");
        Err(OktaError::OieOnlyUnsupported {
            resource: resource.to_string(),
            documentation: documentation.to_string(),
        })
    }

    /// The system default policy of `policy_type`, discovered once.
    pub async fn default_policy(&self, ctx: &CallContext, policy_type: &str) -> OktaResult<Policy> {
        defaults::find_default_policy(self, ctx, policy_type).await
    }

    pub(crate) fn cached_default(&self, policy_type: &str) -> Option<Policy> {
        self.default_policies.get(policy_type).map(|p| p.value().clone())
    }

    pub(crate) fn cache_default(&self, policy_type: &str, policy: Policy) {
        self.default_policies.insert(policy_type.to_string(), policy);
    }
}
