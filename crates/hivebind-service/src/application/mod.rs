//! Application layer: the service's settings schema and the use cases the
//! operator CLI drives.
//!
//! Nothing here touches the OS.  Every function takes a
//! [`ServiceSettings`](service_settings::ServiceSettings) already bound to a
//! store, so tests run against `MemoryStore` and production against the
//! registry without change.
//!
//! - **`service_settings`** – schema declaration, `LogLevel`, and
//!   `ServiceField` for fields chosen at runtime.
//! - **`inspect_settings`** – snapshot of every field for `show`.

pub mod inspect_settings;
pub mod service_settings;
