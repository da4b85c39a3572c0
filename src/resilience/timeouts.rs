//! Timeout enforcement.
//!
//! Every backend exchange runs under a single deadline. When it expires the
//! inner future is dropped, which cancels the in-flight request and releases
//! its connection.

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::backend::BackendError;

/// Run `fut` under `deadline`, mapping expiry to [`BackendError::Timeout`].
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(deadline)),
    }
}
