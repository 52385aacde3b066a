// SQLite store for desires, invocations and correction rules.
// Schema-versioned with forward-only additive migrations.

mod cancel;
mod error;
mod local;
mod queries;
pub mod schema;
mod traits;

// Public API
pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use local::LocalStore;
pub use traits::Store;
