//! Resource descriptors: a name, flags and hook function values.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

use tfokta_core::{CallContext, OktaResult};

use crate::backoff::Poller;
use crate::bundle::ClientBundle;
use crate::instance::{Attributes, ResourceInstance};

/// Everything a hook receives.
#[derive(Debug, Clone)]
pub struct HookInput {
    pub bundle: Arc<ClientBundle>,
    pub ctx: CallContext,
    pub instance: ResourceInstance,
}

impl HookInput {
    pub fn id(&self) -> OktaResult<&str> {
        self.instance.require_id()
    }

    pub fn desired(&self) -> &Attributes {
        &self.instance.desired
    }

    pub fn observed(&self) -> Attributes {
        self.instance.observed_or_default()
    }
}

/// Result of a Create hook.
#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    pub id: String,
    pub observed: Attributes,
}

pub type HookFuture<T> = BoxFuture<'static, OktaResult<T>>;
pub type Hook<T> = Arc<dyn Fn(HookInput) -> HookFuture<T> + Send + Sync>;

pub type CreateHook = Hook<Created>;
pub type ReadHook = Hook<Attributes>;
pub type UpdateHook = Hook<Attributes>;
pub type DeleteHook = Hook<()>;

/// Predicate over `(desired, observed)` telling whether a read has caught up.
pub type ConvergedFn = Arc<dyn Fn(&Attributes, &Attributes) -> bool + Send + Sync>;

/// Wrap an async function as a hook.
pub fn hook<T, F, Fut>(f: F) -> Hook<T>
where
    F: Fn(HookInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = OktaResult<T>> + Send + 'static,
{
    Arc::new(move |input| f(input).boxed())
}

/// Bounded polling of Read after Create.
#[derive(Clone)]
pub struct ConsistencyWindow {
    pub poller: Poller,
    pub converged: ConvergedFn,
}

impl ConsistencyWindow {
    /// Converged as soon as Read succeeds.
    pub fn visible(max_elapsed: Duration) -> Self {
        Self {
            poller: Poller::new(Duration::from_millis(250), max_elapsed),
            converged: Arc::new(|_, _| true),
        }
    }

    pub fn until<F>(max_elapsed: Duration, converged: F) -> Self
    where
        F: Fn(&Attributes, &Attributes) -> bool + Send + Sync + 'static,
    {
        Self {
            poller: Poller::new(Duration::from_millis(250), max_elapsed),
            converged: Arc::new(converged),
        }
    }

    #[must_use]
    pub fn poller(mut self, poller: Poller) -> Self {
        self.poller = poller;
        self
    }
}

impl fmt::Debug for ConsistencyWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsistencyWindow")
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

/// How an import key maps onto the instance.
///
/// The last segment is the identifier; earlier segments are written to the
/// named desired attributes, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub parent_fields: Vec<&'static str>,
}

impl ImportSpec {
    pub fn parts(&self) -> usize {
        self.parent_fields.len() + 1
    }
}

/// A resource kind.
#[derive(Clone)]
pub struct ResourceDescriptor {
    pub name: &'static str,
    /// Documentation link for kinds that need Identity Engine.
    pub oie_only: Option<&'static str>,
    /// Named lock held around Create, Update and Delete.
    pub lock: Option<&'static str>,
    pub consistency: Option<ConsistencyWindow>,
    pub import: Option<ImportSpec>,
    pub create: CreateHook,
    pub read: ReadHook,
    /// Kinds without an update hook are replaced instead.
    pub update: Option<UpdateHook>,
    pub delete: DeleteHook,
}

impl ResourceDescriptor {
    pub fn new(name: &'static str, create: CreateHook, read: ReadHook, delete: DeleteHook) -> Self {
        Self {
            name,
            oie_only: None,
            lock: None,
            consistency: None,
            import: Some(ImportSpec {
                parent_fields: Vec::new(),
            }),
            create,
            read,
            update: None,
            delete,
        }
    }

    #[must_use]
    pub fn update(mut self, update: UpdateHook) -> Self {
        self.update = Some(update);
        self
    }

    #[must_use]
    pub fn oie_only(mut self, documentation: &'static str) -> Self {
        self.oie_only = Some(documentation);
        self
    }

    #[must_use]
    pub fn lock(mut self, name: &'static str) -> Self {
        self.lock = Some(name);
        self
    }

    #[must_use]
    pub fn consistency(mut self, window: ConsistencyWindow) -> Self {
        self.consistency = Some(window);
        self
    }

    /// Import keys of the form `<parent>/.../<id>`.
    #[must_use]
    pub fn import_parents(mut self, parent_fields: &[&'static str]) -> Self {
        self.import = Some(ImportSpec {
            parent_fields: parent_fields.to_vec(),
        });
        self
    }

    #[must_use]
    pub fn without_import(mut self) -> Self {
        self.import = None;
        self
    }
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("name", &self.name)
            .field("oie_only", &self.oie_only.is_some())
            .field("lock", &self.lock)
            .field("consistency", &self.consistency)
            .field("import", &self.import)
            .field("update", &self.update.is_some())
            .finish_non_exhaustive()
    }
}
