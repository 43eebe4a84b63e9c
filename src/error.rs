//! Error types for the event registry.

use crate::types::{Channel, SubscriptionId};
use thiserror::Error;

/// Error returned by a listener. Boxed so listeners can surface any error type.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by listeners.
pub type ListenerResult = std::result::Result<(), ListenerError>;

/// One listener failure recorded while dispatching with [`ErrorPolicy::Isolate`].
///
/// [`ErrorPolicy::Isolate`]: crate::ErrorPolicy::Isolate
#[derive(Debug)]
pub struct ListenerFailure {
    pub id: SubscriptionId,
    pub error: ListenerError,
}

/// Main error type for registry operations.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Listener {id} on channel {channel} failed: {source}")]
    Listener {
        id: SubscriptionId,
        channel: Channel,
        #[source]
        source: ListenerError,
    },

    #[error("{} listener(s) on channel {channel} failed", .failures.len())]
    ListenersFailed {
        channel: Channel,
        failures: Vec<ListenerFailure>,
    },
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, EventError>;
