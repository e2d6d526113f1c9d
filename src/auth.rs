//! Clearance credential models: cookie sets, cache entries, and header-safe cookie values.

pub mod cookie;
pub mod credential;
pub mod entry;

pub use cookie::*;
pub use credential::*;
pub use entry::*;
