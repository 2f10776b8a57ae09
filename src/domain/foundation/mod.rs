//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, error types and event plumbing
//! that form the vocabulary of the membership domain.

mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;
mod year_month;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{
    DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent,
};
pub use ids::{PlanId, SubscriptionId, TierId, UserId};
pub use state_machine::{InvalidTransition, StateMachine};
pub use timestamp::Timestamp;
pub use year_month::YearMonth;
