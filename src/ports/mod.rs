//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `SubscriptionRepository` - Subscription aggregates, one live per user
//! - `ActivityStore` - Atomic increments of per-user activity aggregates
//! - `CatalogSource` - Backing store the catalog snapshot is loaded from
//!
//! ## Collaborator Ports
//!
//! - `CohortProvider` - Cohort memberships from the identity layer
//! - `Clock` - Injectable wall-clock
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Port for publishing domain events
//! - `EventSubscriber` - Port for subscribing to domain events
//! - `EventHandler` - Handler that processes incoming events

mod activity_store;
mod catalog_source;
mod clock;
mod cohort_provider;
mod event_publisher;
mod event_subscriber;
mod subscription_repository;

pub use activity_store::ActivityStore;
pub use catalog_source::CatalogSource;
pub use clock::Clock;
pub use cohort_provider::CohortProvider;
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber};
pub use subscription_repository::{ExpiryCursor, SubscriptionRepository};
