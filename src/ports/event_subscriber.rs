//! EventSubscriber port - Interface for subscribing to domain events.
//!
//! Downstream consumers (renewal reminders, tier-change notifications)
//! register handlers for subscription event types.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Handler for processing domain events.
///
/// Implementations should be idempotent: delivery is at-least-once.
///
/// # Example
///
/// ```ignore
/// struct RenewalReminder { /* ... */ }
///
/// #[async_trait]
/// impl EventHandler for RenewalReminder {
///     async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
///         let payload: SubscriptionEvent = event.payload_as()?;
///         // Queue a reminder for payload.user_id...
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "RenewalReminder"
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process an event.
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Port for subscribing to domain events.
///
/// ```ignore
/// subscriber.subscribe("subscription.renewal_due", reminder);
/// subscriber.subscribe_all(&["subscription.cancelled", "subscription.expired"], churn_tracker);
/// ```
pub trait EventSubscriber: Send + Sync {
    /// Subscribe handler to a specific event type.
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    /// Subscribe handler to multiple event types.
    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>);
}

/// Combined trait for event bus implementations.
pub trait EventBus: super::EventPublisher + EventSubscriber {}

impl<T: super::EventPublisher + EventSubscriber> EventBus for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_and_subscriber_are_object_safe() {
        fn _handler(_: &dyn EventHandler) {}
        fn _subscriber(_: &dyn EventSubscriber) {}
    }
}
