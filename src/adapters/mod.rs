//! Adapters - Implementations of port interfaces.
//!
//! - `events` - In-process event bus
//! - `memory` - In-memory repositories, stores and providers
//! - `clock` - System and manually driven clocks

mod clock;
pub mod events;
pub mod memory;

pub use clock::{ManualClock, SystemClock};
pub use events::InMemoryEventBus;
pub use memory::{
    InMemoryActivityStore, InMemoryCohortProvider, InMemorySubscriptionRepository,
    StaticCatalogSource,
};
