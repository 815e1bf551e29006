//! Wait specifications for concrete resource families.
//!
//! Each family owns its status vocabulary and builds its [`WaitSpec`]s
//! explicitly; nothing is registered globally. Every constructor takes the
//! caller's timeout and returns a validated spec.
//!
//! [`WaitSpec`]: crate::wait::WaitSpec

pub mod fleet;
pub mod instance;
pub mod nat_gateway;
pub mod route;
