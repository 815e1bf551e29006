//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::env;
use std::ffi::OsString;
use std::future::{Ready, ready};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use uuid::Uuid;

use crate::driver::{ApiFuture, ResourceApi};
use crate::error::{Classify, ErrorKind};
use crate::id::{IdCodec, IdError};
use crate::observation::{Observation, RefreshResult};

/// Error raised by [`ScriptedProbe`] when a failure step is replayed.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("scripted probe failure: {message}")]
pub struct ProbeError {
    /// Message supplied when the step was scripted.
    pub message: String,
    /// Classification reported through [`Classify`].
    pub kind: ErrorKind,
}

impl ProbeError {
    /// Builds an error that classifies as [`ErrorKind::Remote`].
    #[must_use]
    pub fn remote(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ErrorKind::Remote,
        }
    }

    /// Builds an error that classifies as [`ErrorKind::NotFound`].
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ErrorKind::NotFound,
        }
    }
}

impl Classify for ProbeError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// One scripted probe response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProbeStep<T, S> {
    /// Report this observation.
    Observe(Observation<T, S>),
    /// Fail the probe.
    Fail(ProbeError),
}

#[derive(Debug)]
struct ProbeScript<T, S> {
    steps: VecDeque<ProbeStep<T, S>>,
    last: Option<ProbeStep<T, S>>,
    calls: u32,
}

/// Refresh probe that replays pre-seeded steps in FIFO order.
///
/// Once the script runs dry the final step repeats, so a probe scripted to
/// end on a pending status keeps reporting it until the wait times out.
/// Clones share the same script and call counter.
#[derive(Debug)]
pub struct ScriptedProbe<T, S> {
    script: Arc<Mutex<ProbeScript<T, S>>>,
}

impl<T, S> Clone for ScriptedProbe<T, S> {
    fn clone(&self) -> Self {
        Self {
            script: Arc::clone(&self.script),
        }
    }
}

impl<T, S> Default for ScriptedProbe<T, S> {
    fn default() -> Self {
        Self {
            script: Arc::new(Mutex::new(ProbeScript {
                steps: VecDeque::new(),
                last: None,
                calls: 0,
            })),
        }
    }
}

impl ScriptedProbe<String, String> {
    /// Scripts one observation per label. The empty label means not found;
    /// every other label is both the object and its status.
    #[must_use]
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let probe = Self::new();
        for label in labels {
            probe.push(ProbeStep::Observe(Observation::from_label(
                label.to_owned(),
                label.to_owned(),
            )));
        }
        probe
    }
}

impl<T, S> ScriptedProbe<T, S>
where
    T: Clone + Send + 'static,
    S: Clone + Send + 'static,
{
    /// Creates a probe with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn push(&self, step: ProbeStep<T, S>) {
        self.lock().steps.push_back(step);
    }

    /// Appends a found observation.
    pub fn push_found(&self, object: T, status: S) {
        self.push(ProbeStep::Observe(Observation::found(object, status)));
    }

    /// Appends a not-found observation.
    pub fn push_not_found(&self) {
        self.push(ProbeStep::Observe(Observation::NotFound));
    }

    /// Appends a failing probe.
    pub fn push_failure(&self, error: ProbeError) {
        self.push(ProbeStep::Fail(error));
    }

    /// Number of probes performed so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.lock().calls
    }

    /// Returns a refresh closure suitable for [`crate::wait::wait_for_state`].
    #[must_use]
    pub fn probe(
        &self,
    ) -> impl FnMut() -> Ready<RefreshResult<T, S, ProbeError>> + Send + use<T, S> {
        let handle = self.clone();
        move || ready(handle.next_result())
    }

    fn next_result(&self) -> RefreshResult<T, S, ProbeError> {
        let mut script = self.lock();
        script.calls = script.calls.saturating_add(1);
        let step = match script.steps.pop_front() {
            Some(step) => {
                script.last = Some(step.clone());
                Some(step)
            }
            None => script.last.clone(),
        };
        match step {
            Some(ProbeStep::Observe(observation)) => Ok(observation),
            Some(ProbeStep::Fail(error)) => Err(error),
            None => Err(ProbeError::remote("no scripted response available")),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProbeScript<T, S>> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Status reported while a fake resource is provisioning.
pub const FAKE_PENDING: &str = "pending";
/// Status reported once a fake resource has settled.
pub const FAKE_AVAILABLE: &str = "available";
/// Status reported while an update is being applied.
pub const FAKE_MODIFYING: &str = "modifying";
/// Status reported while a delete is in progress.
pub const FAKE_DELETING: &str = "deleting";

/// How many describe calls each transition of [`FakeControlPlane`] lasts.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Lag {
    /// Reads after a create that still report not found.
    pub invisible_reads: u32,
    /// Reads reporting `pending` after create or `modifying` after update.
    pub transition_reads: u32,
    /// Reads reporting `deleting` before the resource disappears.
    pub deleting_reads: u32,
}

/// Declarative input accepted by [`FakeControlPlane`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FakeRequest {
    /// Parent the resource attaches to, the first half of its composite ID.
    pub parent: String,
    /// Mutable display name.
    pub name: String,
}

/// Object returned by [`FakeControlPlane`] describe calls.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FakeResource {
    /// Composite identifier `parent,resource`.
    pub id: String,
    /// Parent identifier.
    pub parent: String,
    /// Display name.
    pub name: String,
    /// Status at the time of the read.
    pub status: String,
    /// Number of updates applied.
    pub revision: u32,
}

/// Errors raised by [`FakeControlPlane`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum FakeApiError {
    /// The resource does not exist.
    #[error("resource {0} not found")]
    NotFound(String),
    /// The identifier could not be parsed.
    #[error(transparent)]
    Id(#[from] IdError),
    /// A failure queued with [`FakeControlPlane::fail_next`].
    #[error("injected failure: {0}")]
    Injected(String),
}

impl Classify for FakeApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Id(err) => err.kind(),
            Self::Injected(_) => ErrorKind::Remote,
        }
    }
}

/// Remote calls recorded by [`FakeControlPlane`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ApiCall {
    /// A create call.
    Create,
    /// A describe call.
    Describe,
    /// An update call.
    Update,
    /// A delete call.
    Delete,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Provisioning,
    Ready,
    Modifying,
    Deleting,
}

#[derive(Debug)]
struct FakeEntity {
    resource: FakeResource,
    phase: Phase,
    reads: u32,
}

#[derive(Debug, Default)]
struct PlaneState {
    lag: Lag,
    entities: HashMap<String, FakeEntity>,
    failures: VecDeque<(ApiCall, String)>,
    calls: Vec<ApiCall>,
}

impl PlaneState {
    fn record(&mut self, call: ApiCall) -> Result<(), FakeApiError> {
        self.calls.push(call);
        match self.failures.iter().position(|(queued, _)| *queued == call) {
            Some(index) => match self.failures.remove(index) {
                Some((_, message)) => Err(FakeApiError::Injected(message)),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }

    fn entity_mut(&mut self, id: &str) -> Result<&mut FakeEntity, FakeApiError> {
        self.entities
            .get_mut(id)
            .ok_or_else(|| FakeApiError::NotFound(id.to_owned()))
    }
}

/// In-memory control plane with eventually consistent reads.
///
/// Created resources stay invisible for [`Lag::invisible_reads`] describe
/// calls, then report `pending` before settling on `available`. Updates and
/// deletes pass through `modifying` and `deleting` the same way. Clones share
/// state, so a test can keep a handle after moving one into a
/// [`crate::driver::Reconciler`].
#[derive(Clone, Debug, Default)]
pub struct FakeControlPlane {
    state: Arc<Mutex<PlaneState>>,
    codec: IdCodec,
}

impl FakeControlPlane {
    /// Creates an empty control plane with the given lag profile.
    #[must_use]
    pub fn new(lag: Lag) -> Self {
        let plane = Self::default();
        plane.lock().lag = lag;
        plane
    }

    /// Makes the next `call` fail with `message`.
    pub fn fail_next(&self, call: ApiCall, message: impl Into<String>) {
        self.lock().failures.push_back((call, message.into()));
    }

    /// Seeds a settled resource, returning its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`FakeApiError::Id`] when the parent cannot be encoded.
    pub fn seed(&self, request: &FakeRequest) -> Result<String, FakeApiError> {
        let id = self.insert(request)?;
        if let Some(entity) = self.lock().entities.get_mut(&id) {
            entity.phase = Phase::Ready;
        }
        Ok(id)
    }

    /// Removes a resource out of band, as if someone deleted it by hand.
    pub fn forget(&self, id: &str) {
        self.lock().entities.remove(id);
    }

    /// Returns `true` while the resource exists, ignoring read lag.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.lock().entities.contains_key(id)
    }

    /// Returns every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Counts calls of one kind.
    #[must_use]
    pub fn count(&self, call: ApiCall) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|recorded| **recorded == call)
            .count()
    }

    fn insert(&self, request: &FakeRequest) -> Result<String, FakeApiError> {
        let local = format!("res-{}", Uuid::new_v4().simple());
        let id = self.codec.encode([request.parent.as_str(), local.as_str()])?;
        let resource = FakeResource {
            id: id.clone(),
            parent: request.parent.clone(),
            name: request.name.clone(),
            status: String::from(FAKE_PENDING),
            revision: 0,
        };
        self.lock().entities.insert(
            id.clone(),
            FakeEntity {
                resource,
                phase: Phase::Provisioning,
                reads: 0,
            },
        );
        Ok(id)
    }

    fn create_now(&self, request: &FakeRequest) -> Result<String, FakeApiError> {
        self.lock().record(ApiCall::Create)?;
        self.insert(request)
    }

    fn describe_now(
        &self,
        id: &str,
    ) -> Result<Observation<FakeResource, &'static str>, FakeApiError> {
        self.codec.decode_pair(id)?;
        let mut state = self.lock();
        state.record(ApiCall::Describe)?;
        let lag = state.lag;

        let Some(entity) = state.entities.get_mut(id) else {
            return Ok(Observation::NotFound);
        };
        entity.reads = entity.reads.saturating_add(1);
        let reads = entity.reads;
        let phase = entity.phase;
        let status = match phase {
            Phase::Provisioning if reads <= lag.invisible_reads => {
                return Ok(Observation::NotFound);
            }
            Phase::Provisioning
                if reads <= lag.invisible_reads.saturating_add(lag.transition_reads) =>
            {
                FAKE_PENDING
            }
            Phase::Modifying if reads <= lag.transition_reads => FAKE_MODIFYING,
            Phase::Deleting if reads <= lag.deleting_reads => FAKE_DELETING,
            Phase::Deleting => {
                state.entities.remove(id);
                return Ok(Observation::NotFound);
            }
            Phase::Provisioning | Phase::Modifying | Phase::Ready => {
                entity.phase = Phase::Ready;
                FAKE_AVAILABLE
            }
        };
        entity.resource.status = String::from(status);
        Ok(Observation::found(entity.resource.clone(), status))
    }

    fn update_now(&self, id: &str, request: &FakeRequest) -> Result<(), FakeApiError> {
        self.codec.decode_pair(id)?;
        let mut state = self.lock();
        state.record(ApiCall::Update)?;
        let entity = state.entity_mut(id)?;
        entity.resource.name.clone_from(&request.name);
        entity.resource.revision = entity.resource.revision.saturating_add(1);
        entity.phase = Phase::Modifying;
        entity.reads = 0;
        Ok(())
    }

    fn delete_now(&self, id: &str) -> Result<(), FakeApiError> {
        self.codec.decode_pair(id)?;
        let mut state = self.lock();
        state.record(ApiCall::Delete)?;
        let entity = state.entity_mut(id)?;
        entity.phase = Phase::Deleting;
        entity.reads = 0;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, PlaneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResourceApi for FakeControlPlane {
    type Request = FakeRequest;
    type Object = FakeResource;
    type Status = &'static str;
    type Error = FakeApiError;

    fn create<'a>(&'a self, request: &'a Self::Request) -> ApiFuture<'a, String, Self::Error> {
        Box::pin(ready(self.create_now(request)))
    }

    fn describe<'a>(
        &'a self,
        id: &'a str,
    ) -> ApiFuture<'a, Observation<Self::Object, Self::Status>, Self::Error> {
        Box::pin(ready(self.describe_now(id)))
    }

    fn update<'a>(
        &'a self,
        id: &'a str,
        request: &'a Self::Request,
    ) -> ApiFuture<'a, (), Self::Error> {
        Box::pin(ready(self.update_now(id, request)))
    }

    fn delete<'a>(&'a self, id: &'a str) -> ApiFuture<'a, (), Self::Error> {
        Box::pin(ready(self.delete_now(id)))
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: AsyncMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets `CONVERGE_*` style variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let previous = pairs
            .iter()
            .map(|(key, value)| {
                let old = env::var_os(key);
                // SAFETY: Environment mutation is serialised by `ENV_LOCK`.
                unsafe { env::set_var(key, value) };
                ((*key).to_owned(), old)
            })
            .collect();

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
