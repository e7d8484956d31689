//! Infrastructure layer for the service.
//!
//! Contains OS-facing adapters: the registry store, the TOML startup file,
//! and the log subscriber.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `hivebind_core`, but MUST NOT be imported by the `application` layer.

pub mod logging;
pub mod registry;
pub mod storage;
