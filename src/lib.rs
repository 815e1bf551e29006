//! Core library for reconciling declared resources against eventually
//! consistent control planes.
//!
//! A resource driver issues one imperative call (create, update, delete) and
//! then polls the remote entity until it settles. The crate supplies the
//! pieces every such driver needs: a state-change waiter that tolerates
//! read-after-write lag and status flapping, a time-bounded retry wrapper, a
//! composite identifier codec, and a generic [`Reconciler`] tying them
//! together.

pub mod backoff;
pub mod config;
pub mod driver;
pub mod error;
pub mod families;
pub mod id;
pub mod observation;
pub mod retry;
pub mod test_support;
pub mod wait;

pub use config::{ConfigError, ReconcileConfig};
pub use driver::{ApiFuture, Created, Operation, ReconcileError, Reconciler, ResourceApi};
pub use error::{Classify, ErrorKind};
pub use id::{DEFAULT_SEPARATOR, IdCodec, IdError, decode_id, encode_id};
pub use observation::{Observation, Refresh, RefreshResult, StatusLabel};
pub use retry::{
    AbsenceError, RetryDecision, RetryError, RetryPolicy, retry, retry_until_not_found,
    retry_when, retry_when_new_resource_not_found, retry_when_not_found,
};
pub use wait::{SpecError, WaitError, WaitSpec, WaitSpecBuilder, wait_for_state, wait_for_state_with_cancel};
