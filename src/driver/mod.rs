//! Resource reconciliation driver.
//!
//! Each create, update, or delete issues exactly one mutating call, then
//! hands a probe closed over the entity's identifier to the waiter. Errors
//! are wrapped with the operation that produced them but otherwise surfaced
//! untouched; no retries happen at this layer.

mod error;

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::Classify;
use crate::observation::{Observation, StatusLabel};
use crate::wait::{WaitSpec, wait_for_state, wait_for_state_with_cancel};

pub use error::{Operation, ReconcileError};

/// Future returned by remote API operations.
pub type ApiFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Imperative remote API for one resource type, implemented per resource.
pub trait ResourceApi {
    /// Declarative input for create and update.
    type Request: Sync;
    /// Object returned by describe calls.
    type Object: Debug + Send;
    /// Status vocabulary of the resource.
    type Status: StatusLabel;
    /// Error raised by the remote API.
    type Error: std::error::Error + Classify + Send + Sync + 'static;

    /// Issues the create call and returns the durable identifier, which may
    /// be a composite ID built with [`crate::id`].
    fn create<'a>(&'a self, request: &'a Self::Request) -> ApiFuture<'a, String, Self::Error>;

    /// Reports the current state of `id`. Must map "does not exist" to
    /// [`Observation::NotFound`] rather than an error.
    fn describe<'a>(
        &'a self,
        id: &'a str,
    ) -> ApiFuture<'a, Observation<Self::Object, Self::Status>, Self::Error>;

    /// Issues the update call for `id`.
    fn update<'a>(
        &'a self,
        id: &'a str,
        request: &'a Self::Request,
    ) -> ApiFuture<'a, (), Self::Error>;

    /// Issues the delete call for `id`.
    fn delete<'a>(&'a self, id: &'a str) -> ApiFuture<'a, (), Self::Error>;
}

/// Identifier and settled object of a freshly created resource.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Created<T> {
    /// Durable identifier to persist.
    pub id: String,
    /// Object observed when the create wait succeeded.
    pub object: T,
}

/// Drives one resource type through create, read, update, and delete.
#[derive(Debug)]
pub struct Reconciler<A: ResourceApi> {
    api: A,
    create_spec: WaitSpec<A::Status>,
    update_spec: Option<WaitSpec<A::Status>>,
    delete_spec: Option<WaitSpec<A::Status>>,
    cancel: Option<CancellationToken>,
}

impl<A: ResourceApi> Reconciler<A> {
    /// Creates a driver that waits on `create_spec` after every create.
    #[must_use]
    pub const fn new(api: A, create_spec: WaitSpec<A::Status>) -> Self {
        Self {
            api,
            create_spec,
            update_spec: None,
            delete_spec: None,
            cancel: None,
        }
    }

    /// Waits on `spec` after every update.
    #[must_use]
    pub fn with_update_spec(mut self, spec: WaitSpec<A::Status>) -> Self {
        self.update_spec = Some(spec);
        self
    }

    /// Waits on `spec` after every delete. Use [`WaitSpec::until_gone`] for
    /// resources that disappear once deleted.
    #[must_use]
    pub fn with_delete_spec(mut self, spec: WaitSpec<A::Status>) -> Self {
        self.delete_spec = Some(spec);
        self
    }

    /// Aborts in-flight waits when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the wrapped API.
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Creates the resource and waits for it to settle.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Create`] when the create call fails,
    /// [`ReconcileError::Wait`] when the wait fails, and
    /// [`ReconcileError::Vanished`] when the create spec targets absence.
    pub async fn create(
        &self,
        request: &A::Request,
    ) -> Result<Created<A::Object>, ReconcileError<A::Object, A::Error>> {
        let id = self
            .api
            .create(request)
            .await
            .map_err(ReconcileError::Create)?;
        debug!(id = %id, "create issued, waiting for resource to settle");

        let object = self
            .settle(Operation::Create, &id, &self.create_spec)
            .await?
            .ok_or_else(|| ReconcileError::Vanished {
                operation: Operation::Create,
                id: id.clone(),
            })?;
        info!(id = %id, "resource created");
        Ok(Created { id, object })
    }

    /// Reads the resource once. Absence yields `Ok(None)` so the caller can
    /// drop it from its state.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Read`] when the describe call fails.
    pub async fn read(
        &self,
        id: &str,
    ) -> Result<Option<A::Object>, ReconcileError<A::Object, A::Error>> {
        let observation = self
            .api
            .describe(id)
            .await
            .map_err(|source| ReconcileError::Read {
                id: id.to_owned(),
                source,
            })?;
        match observation {
            Observation::Found { object, .. } => Ok(Some(object)),
            Observation::NotFound => {
                debug!(id, "resource no longer exists");
                Ok(None)
            }
        }
    }

    /// Updates the resource and, when an update spec is set, waits for it to
    /// settle. Without an update spec the resource is read back once.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Update`] when the update call fails and
    /// [`ReconcileError::Wait`] or [`ReconcileError::Read`] when confirming
    /// the new state fails.
    pub async fn update(
        &self,
        id: &str,
        request: &A::Request,
    ) -> Result<Option<A::Object>, ReconcileError<A::Object, A::Error>> {
        self.api
            .update(id, request)
            .await
            .map_err(|source| ReconcileError::Update {
                id: id.to_owned(),
                source,
            })?;

        match &self.update_spec {
            Some(spec) => self.settle(Operation::Update, id, spec).await,
            None => self.read(id).await,
        }
    }

    /// Deletes the resource and waits for the delete spec, if any. A delete
    /// call reporting the resource as already absent counts as success.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Delete`] when the delete call fails for any
    /// other reason and [`ReconcileError::Wait`] when the wait fails.
    pub async fn delete(&self, id: &str) -> Result<(), ReconcileError<A::Object, A::Error>> {
        match self.api.delete(id).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                debug!(id, "resource already deleted");
                return Ok(());
            }
            Err(source) => {
                return Err(ReconcileError::Delete {
                    id: id.to_owned(),
                    source,
                });
            }
        }

        if let Some(spec) = &self.delete_spec {
            self.settle(Operation::Delete, id, spec).await?;
        }
        info!(id, "resource deleted");
        Ok(())
    }

    async fn settle(
        &self,
        operation: Operation,
        id: &str,
        spec: &WaitSpec<A::Status>,
    ) -> Result<Option<A::Object>, ReconcileError<A::Object, A::Error>> {
        let api = &self.api;
        let refresh = move || api.describe(id);
        let waited = match &self.cancel {
            Some(token) => wait_for_state_with_cancel(spec, refresh, token).await,
            None => wait_for_state(spec, refresh).await,
        };
        waited.map_err(|source| ReconcileError::Wait {
            operation,
            id: id.to_owned(),
            source,
        })
    }
}
