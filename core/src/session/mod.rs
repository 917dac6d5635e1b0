//! Sessions, operations and the retry-guarded session handler.

mod retry;
mod traits;

pub use retry::{RetryConfig, RetrySessionHandler};
pub use traits::{Credential, Operation, Resource, Session};
