//! EventPublisher port - Interface for publishing domain events.
//!
//! The lifecycle handlers publish subscription events through this port
//! after the subscription has been persisted.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
///
/// Implementations must ensure:
/// - Events are delivered at-least-once (handlers may receive duplicates)
/// - Errors are propagated to the caller
///
/// # Example
///
/// ```ignore
/// let envelope = SubscriptionEvent::created(&subscription).to_envelope()?;
/// publisher.publish(envelope).await?;
/// ```
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish several events in order.
    ///
    /// Adapters without batch support publish sequentially and stop at the
    /// first failure.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError>;
}
