//! Degrade-never-crash helpers
//!
//! The dashboard's data sources are best effort: when a fetch or a parse
//! fails, the caller gets a documented default and the failure is logged.
//! There are no retries and no distinction between failure kinds.

use std::fmt::Display;
use std::future::Future;

use tracing::{debug, warn};

/// How loudly a swallowed failure is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Log at warn level
    #[default]
    Warn,
    /// Log at debug level; for sources whose absence is routine
    Silent,
}

impl FallbackPolicy {
    fn report(self, operation: &str, error: &dyn Display) {
        match self {
            FallbackPolicy::Warn => {
                warn!("{} failed, using fallback: {:#}", operation, error);
            }
            FallbackPolicy::Silent => {
                debug!("{} failed, using fallback: {:#}", operation, error);
            }
        }
    }
}

/// Await `operation_future` and return its value, or `default` on error
pub async fn with_fallback<T, E, F>(
    operation: &str,
    policy: FallbackPolicy,
    default: T,
    operation_future: F,
) -> T
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match operation_future.await {
        Ok(value) => value,
        Err(error) => {
            policy.report(operation, &error);
            default
        }
    }
}

/// Synchronous counterpart of [`with_fallback`]
pub fn fallback_or<T, E: Display>(
    operation: &str,
    policy: FallbackPolicy,
    default: T,
    result: Result<T, E>,
) -> T {
    match result {
        Ok(value) => value,
        Err(error) => {
            policy.report(operation, &error);
            default
        }
    }
}
