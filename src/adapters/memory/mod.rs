//! In-memory adapters for the persistence and identity ports.
//!
//! Persistence technology is an external collaborator; these adapters are
//! the reference implementation used by the worker and the tests.

mod activity_store;
mod catalog_source;
mod cohort_provider;
mod subscription_repository;

pub use activity_store::InMemoryActivityStore;
pub use catalog_source::StaticCatalogSource;
pub use cohort_provider::InMemoryCohortProvider;
pub use subscription_repository::InMemorySubscriptionRepository;
