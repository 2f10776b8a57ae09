//! In-process event bus.
//!
//! Delivers subscription events synchronously to registered handlers and
//! keeps a log of everything published so callers can inspect the stream.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

/// In-process event bus.
///
/// Handlers run on the publishing task in registration order. Lock
/// poisoning is recovered from, since the guarded data is append-only.
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.subscribe("subscription.renewal_due", reminder);
///
/// bus.publish(SubscriptionEvent::created(&sub).to_envelope()?).await?;
/// assert!(bus.has_event("subscription.created"));
/// ```
#[derive(Default)]
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    published: RwLock<Vec<EventEnvelope>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every envelope published so far, oldest first.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| e.event_type == event_type)
    }

    pub fn clear(&self) {
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn handlers_for(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());

        // Handlers are cloned out so no lock is held across an await.
        let mut failures = Vec::new();
        for handler in self.handlers_for(&event.event_type) {
            if let Err(e) = handler.handle(event.clone()).await {
                tracing::warn!(
                    handler = handler.name(),
                    event_type = %event.event_type,
                    error = %e,
                    "Event handler failed"
                );
                failures.push(format!("{}: {}", handler.name(), e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::InternalError,
                format!("Handler errors: {}", failures.join(", ")),
            ))
        }
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.subscribe_all(&[event_type], handler);
    }

    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        for event_type in event_types {
            handlers
                .entry((*event_type).to_string())
                .or_default()
                .push(Arc::clone(&handler));
        }
    }
}
