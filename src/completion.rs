//! Completion-callback adapter for callers that prefer callbacks
//!
//! Every `EventLog` operation is a plain future. `with_completion` runs one
//! and additionally hands its outcome to a callback as `(error, result)`
//! before returning it unchanged.

use crate::error::{EventLogError, Result};
use std::future::Future;

/// Await `operation`, report its outcome to `callback`, and return it
pub async fn with_completion<T, Fut, F>(operation: Fut, callback: F) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
    F: FnOnce(Option<&EventLogError>, Option<&T>),
{
    let result = operation.await;
    match &result {
        Ok(value) => callback(None, Some(value)),
        Err(e) => callback(Some(e), None),
    }
    result
}
