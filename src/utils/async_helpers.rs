// Async utility functions

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::terminology::{TerminologyError, TerminologyResult};

/// Runs a terminology call with a timeout. Expiry is reported as
/// [`TerminologyError::Timeout`], never as an unknown-terminology outcome.
pub async fn with_timeout<F, T>(future: F, duration: Duration, value_set: &str) -> TerminologyResult<T>
where
    F: Future<Output = TerminologyResult<T>>,
{
    timeout(duration, future)
        .await
        .map_err(|_| TerminologyError::Timeout {
            value_set: value_set.to_string(),
            elapsed: duration,
        })?
}
