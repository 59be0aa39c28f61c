//! Generic CRUD executor over resource descriptors.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use tfokta_core::{CallContext, ImportKey, NotFoundPolicy, OktaError, OktaResult, Operation};

use crate::backoff::PollError;
use crate::bundle::ClientBundle;
use crate::descriptor::{HookInput, ResourceDescriptor};
use crate::instance::{Attributes, ResourceInstance};
use crate::kinds;
use crate::locks::NamedLockGuard;

/// Result of Read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Present(ResourceInstance),
    /// The resource is gone; the host clears its identifier.
    Drifted,
}

impl ReadOutcome {
    pub fn is_drifted(&self) -> bool {
        matches!(self, ReadOutcome::Drifted)
    }

    pub fn into_instance(self) -> Option<ResourceInstance> {
        match self {
            ReadOutcome::Present(instance) => Some(instance),
            ReadOutcome::Drifted => None,
        }
    }
}

/// Result of Update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(ResourceInstance),
    /// The resource must be created again on the next plan.
    Recreate,
}

/// Registry of descriptors bound to one [`ClientBundle`].
#[derive(Debug, Clone)]
pub struct ResourceRuntime {
    bundle: Arc<ClientBundle>,
    descriptors: BTreeMap<&'static str, Arc<ResourceDescriptor>>,
}

impl ResourceRuntime {
    pub fn new(bundle: Arc<ClientBundle>) -> Self {
        Self {
            bundle,
            descriptors: BTreeMap::new(),
        }
    }

    /// Runtime with every built-in kind registered.
    pub fn with_default_kinds(bundle: Arc<ClientBundle>) -> Self {
        let mut runtime = Self::new(bundle);
        for descriptor in kinds::all() {
            runtime.register(descriptor);
        }
        runtime
    }

    /// Register a kind, replacing any previous one with the same name.
    pub fn register(&mut self, descriptor: ResourceDescriptor) {
        self.descriptors.insert(descriptor.name, Arc::new(descriptor));
    }

    /// Names of the registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.descriptors.keys().copied().collect()
    }

    pub fn bundle(&self) -> &Arc<ClientBundle> {
        &self.bundle
    }

    pub fn descriptor(&self, kind: &str) -> OktaResult<Arc<ResourceDescriptor>> {
        self.descriptors
            .get(kind)
            .cloned()
            .ok_or_else(|| OktaError::invalid_input(format!("unknown resource kind {kind:?}")))
    }

    fn input(&self, ctx: &CallContext, instance: ResourceInstance) -> HookInput {
        HookInput {
            bundle: Arc::clone(&self.bundle),
            ctx: ctx.clone(),
            instance,
        }
    }

    async fn gate(&self, ctx: &CallContext, descriptor: &ResourceDescriptor) -> OktaResult<()> {
        match descriptor.oie_only {
            Some(documentation) => {
                self.bundle
                    .require_oie(ctx, descriptor.name, documentation)
                    .await
            }
            None => Ok(()),
        }
    }

    async fn lock(
        &self,
        ctx: &CallContext,
        descriptor: &ResourceDescriptor,
    ) -> OktaResult<Option<NamedLockGuard>> {
        match descriptor.lock {
            Some(name) => Ok(Some(self.bundle.locks().acquire(ctx, name).await?)),
            None => Ok(None),
        }
    }

    /// Create the resource and wait for it to become readable.
    #[instrument(skip(self, ctx, instance))]
    pub async fn create(
        &self,
        ctx: &CallContext,
        kind: &str,
        instance: ResourceInstance,
    ) -> OktaResult<ResourceInstance> {
        let descriptor = self.descriptor(kind)?;
        self.create_with(ctx, &descriptor, instance)
            .await
            .map_err(|e| e.with_resource(kind, None))
    }

    async fn create_with(
        &self,
        ctx: &CallContext,
        descriptor: &ResourceDescriptor,
        instance: ResourceInstance,
    ) -> OktaResult<ResourceInstance> {
        self.gate(ctx, descriptor).await?;
        let desired = instance.desired.clone();

        let created = {
            let _lock = self.lock(ctx, descriptor).await?;
            (descriptor.create)(self.input(ctx, instance)).await?
        };
        info!(kind = descriptor.name, id = %created.id, "Created resource");

        let mut created_instance = ResourceInstance {
            id: Some(created.id.clone()),
            desired,
            observed: Some(created.observed),
        };

        if let Some(window) = &descriptor.consistency {
            let observed = window
                .poller
                .run(ctx, descriptor.name, || {
                    let input = self.input(ctx, created_instance.clone());
                    let read = Arc::clone(&descriptor.read);
                    let converged = Arc::clone(&window.converged);
                    async move {
                        let desired = input.instance.desired.clone();
                        let observed = read(input).await.map_err(PollError::classify)?;
                        if converged(&desired, &observed) {
                            Ok(observed)
                        } else {
                            Err(PollError::Pending("read does not reflect create yet".into()))
                        }
                    }
                })
                .await
                .map_err(|e| e.with_resource(descriptor.name, Some(&created.id)))?;
            created_instance.observed = Some(observed);
        }

        Ok(created_instance)
    }

    /// Read the resource; a missing resource is reported as drift.
    #[instrument(skip(self, ctx, instance), fields(id = ?instance.id))]
    pub async fn read(
        &self,
        ctx: &CallContext,
        kind: &str,
        instance: ResourceInstance,
    ) -> OktaResult<ReadOutcome> {
        let descriptor = self.descriptor(kind)?;
        let id = instance.id.clone();
        self.read_with(ctx, &descriptor, instance)
            .await
            .map_err(|e| e.with_resource(kind, id.as_deref()))
    }

    async fn read_with(
        &self,
        ctx: &CallContext,
        descriptor: &ResourceDescriptor,
        mut instance: ResourceInstance,
    ) -> OktaResult<ReadOutcome> {
        instance.require_id()?;
        match (descriptor.read)(self.input(ctx, instance.clone())).await {
            Ok(observed) => {
                instance.observed = Some(observed);
                Ok(ReadOutcome::Present(instance))
            }
            Err(e) if e.is_not_found() => match NotFoundPolicy::for_operation(Operation::Read) {
                NotFoundPolicy::ClearState => {
                    info!(kind = descriptor.name, id = ?instance.id, "Resource no longer exists");
                    Ok(ReadOutcome::Drifted)
                }
                _ => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Apply desired attributes to an existing resource.
    #[instrument(skip(self, ctx, instance), fields(id = ?instance.id))]
    pub async fn update(
        &self,
        ctx: &CallContext,
        kind: &str,
        instance: ResourceInstance,
    ) -> OktaResult<UpdateOutcome> {
        let descriptor = self.descriptor(kind)?;
        let id = instance.id.clone();
        self.update_with(ctx, &descriptor, instance)
            .await
            .map_err(|e| e.with_resource(kind, id.as_deref()))
    }

    async fn update_with(
        &self,
        ctx: &CallContext,
        descriptor: &ResourceDescriptor,
        mut instance: ResourceInstance,
    ) -> OktaResult<UpdateOutcome> {
        instance.require_id()?;
        self.gate(ctx, descriptor).await?;

        let observed = instance.observed_or_default();
        let changed = instance.desired.changed_from(&observed).len();
        if changed == 0 {
            debug!(kind = descriptor.name, "No changes to apply");
            return Ok(UpdateOutcome::Updated(instance));
        }

        let Some(update) = &descriptor.update else {
            debug!(kind = descriptor.name, changed, "Kind has no in-place update, replacing");
            return Ok(UpdateOutcome::Recreate);
        };

        let result = {
            let _lock = self.lock(ctx, descriptor).await?;
            update(self.input(ctx, instance.clone())).await
        };

        match result {
            Ok(observed) => {
                instance.observed = Some(observed);
                Ok(UpdateOutcome::Updated(instance))
            }
            Err(e) if e.is_not_found() => match NotFoundPolicy::for_operation(Operation::Update) {
                NotFoundPolicy::Recreate => {
                    info!(kind = descriptor.name, id = ?instance.id, "Resource vanished, recreate on next plan");
                    Ok(UpdateOutcome::Recreate)
                }
                _ => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Delete the resource; deleting a missing resource succeeds.
    #[instrument(skip(self, ctx, instance), fields(id = ?instance.id))]
    pub async fn delete(
        &self,
        ctx: &CallContext,
        kind: &str,
        instance: ResourceInstance,
    ) -> OktaResult<()> {
        let descriptor = self.descriptor(kind)?;
        let id = instance.id.clone();
        self.delete_with(ctx, &descriptor, instance)
            .await
            .map_err(|e| e.with_resource(kind, id.as_deref()))
    }

    async fn delete_with(
        &self,
        ctx: &CallContext,
        descriptor: &ResourceDescriptor,
        instance: ResourceInstance,
    ) -> OktaResult<()> {
        instance.require_id()?;
        self.gate(ctx, descriptor).await?;

        let _lock = self.lock(ctx, descriptor).await?;
        match (descriptor.delete)(self.input(ctx, instance)).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => match NotFoundPolicy::for_operation(Operation::Delete) {
                NotFoundPolicy::TreatAsSuccess => {
                    debug!(kind = descriptor.name, "Already deleted");
                    Ok(())
                }
                _ => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Import by key, then Read.
    #[instrument(skip(self, ctx))]
    pub async fn import(
        &self,
        ctx: &CallContext,
        kind: &str,
        key: &str,
    ) -> OktaResult<ResourceInstance> {
        let descriptor = self.descriptor(kind)?;
        let spec = descriptor.import.as_ref().ok_or_else(|| {
            OktaError::invalid_input(format!("{kind} does not support import")).with_resource(kind, None)
        })?;

        let key = ImportKey::parse(key, spec.parts()).map_err(|e| e.with_resource(kind, None))?;
        let mut desired = Attributes::new();
        for (field, value) in spec.parent_fields.iter().zip(key.parts()) {
            desired.set(*field, value.as_str());
        }
        let instance = ResourceInstance::new(desired).with_id(key.last());

        match self.read(ctx, kind, instance).await? {
            ReadOutcome::Present(mut instance) => {
                // adopt what the server holds so the next plan is a no-op
                if let Some(observed) = &instance.observed {
                    for (name, value) in observed.iter() {
                        instance.desired.set(name.clone(), value.clone());
                    }
                }
                Ok(instance)
            }
            ReadOutcome::Drifted => Err(OktaError::not_found(format!(
                "cannot import {kind} {key}: resource does not exist"
            ))
            .with_resource(kind, Some(key.last()))),
        }
    }
}
