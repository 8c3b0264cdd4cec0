//! Hub Types - shared data types for the Global Music Hub API
//!
//! Pure serde types with no async runtime dependencies. Station payloads stay
//! opaque JSON objects; only their `stationuuid` key is interpreted.

pub mod api;
pub mod comment;
pub mod station;

pub use api::*;
pub use comment::*;
pub use station::*;
