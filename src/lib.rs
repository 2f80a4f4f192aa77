// Lapse - pluggable TTL session storage for Rust services
//
// This library re-exports the session engine and its stores, and adds a
// logging bootstrap for applications embedding it.

// Re-export the session crate
pub use lapse_session::*;

pub mod logging;

// Prelude for common imports
pub mod prelude {
    pub use lapse_session::prelude::*;
    pub use tokio_util::sync::CancellationToken;
}
