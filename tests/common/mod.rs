//! Shared setup for the integration tests: the default configuration wired to
//! the in-memory adapters and a manually driven clock.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use membership_engine::adapters::ManualClock;
use membership_engine::application::handlers::RecordActivityCommand;
use membership_engine::bootstrap::InMemoryEngine;
use membership_engine::config::AppConfig;
use membership_engine::domain::foundation::{PlanId, TierId, Timestamp, UserId};

pub struct Harness {
    pub engine: InMemoryEngine,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let clock = Arc::new(ManualClock::new(start()));
        let engine = InMemoryEngine::build(&config, clock.clone())
            .await
            .expect("default configuration wires up");
        Self { engine, clock }
    }

    pub fn order(&self, user_id: &str, value: f64) -> RecordActivityCommand {
        RecordActivityCommand {
            user_id: user(user_id),
            activity_type: "ORDER".to_string(),
            value,
            occurred_at: None,
        }
    }
}

/// 2024-03-10 09:00 UTC.
pub fn start() -> Timestamp {
    Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap())
}

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub fn plan(id: &str) -> PlanId {
    PlanId::new(id).unwrap()
}

pub fn tier(id: &str) -> TierId {
    TierId::new(id).unwrap()
}
