//! Event infrastructure for domain event publishing.
//!
//! - `EventId` - Unique identifier for events (deduplication)
//! - `EventMetadata` - Audit context (the affected user)
//! - `EventEnvelope` - Transport wrapper for domain events
//! - `DomainEvent` - Trait that all domain events implement

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::{DomainError, ErrorCode, Timestamp};

/// Trait that all domain events must implement.
pub trait DomainEvent: Send + Sync {
    /// Returns the event type string (e.g., "subscription.created.v1").
    /// Used for routing and filtering.
    fn event_type(&self) -> &'static str;

    /// Returns the ID of the aggregate that emitted this event.
    fn aggregate_id(&self) -> String;

    /// Returns the type of aggregate (e.g., "Subscription").
    fn aggregate_type(&self) -> &'static str;

    /// Returns when the event occurred.
    fn occurred_at(&self) -> Timestamp;

    /// Returns the unique ID for this event instance.
    fn event_id(&self) -> EventId;
}

/// Extension trait that provides `to_envelope()` for serializable domain events.
pub trait SerializableDomainEvent: DomainEvent + Serialize {
    /// Converts this domain event into an `EventEnvelope` for transport.
    fn to_envelope(&self) -> Result<EventEnvelope, DomainError> {
        EventEnvelope::from_event(self)
    }
}

impl<T: DomainEvent + Serialize> SerializableDomainEvent for T {}

/// Unique identifier for events (used for deduplication).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates a new random EventId using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates an EventId from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Audit metadata carried alongside the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// User whose subscription the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Transport envelope for domain events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique ID for this event instance.
    pub event_id: EventId,

    /// Event type for routing (e.g., "subscription.created.v1").
    pub event_type: String,

    /// Schema version number (extracted from event_type).
    pub schema_version: u32,

    /// ID of the aggregate that emitted this event.
    pub aggregate_id: String,

    /// Type of aggregate.
    pub aggregate_type: String,

    /// When the event occurred.
    pub occurred_at: Timestamp,

    /// Event-specific payload as JSON.
    pub payload: JsonValue,

    /// Audit metadata.
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    /// Creates an envelope from a domain event, serializing it as the payload.
    pub fn from_event<T>(event: &T) -> Result<Self, DomainError>
    where
        T: DomainEvent + Serialize + ?Sized,
    {
        let event_type = event.event_type().to_string();
        let schema_version = Self::extract_version(&event_type);
        let payload = serde_json::to_value(event).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("failed to serialize {}: {}", event_type, e),
            )
        })?;

        Ok(Self {
            event_id: event.event_id(),
            event_type,
            schema_version,
            aggregate_id: event.aggregate_id(),
            aggregate_type: event.aggregate_type().to_string(),
            occurred_at: event.occurred_at(),
            payload,
            metadata: EventMetadata::default(),
        })
    }

    /// Extracts version number from event_type string ("x.y.v2" → 2, default 1).
    pub(crate) fn extract_version(event_type: &str) -> u32 {
        event_type
            .rsplit_once(".v")
            .and_then(|(_, version_str)| version_str.parse::<u32>().ok())
            .unwrap_or(1)
    }

    /// Add user ID for audit.
    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.user_id = Some(id.into());
        self
    }

    /// Deserialize payload to a specific event type.
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}
