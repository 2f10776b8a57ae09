//! Per-user rolling activity aggregate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::{Timestamp, UserId, YearMonth};

use super::{Activity, ActivityType};

/// Counters for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub month: YearMonth,
    pub order_count: u32,
    pub order_value: Decimal,
    pub returned_value: Decimal,
    pub review_count: u32,
    pub referral_count: u32,
}

impl MonthBucket {
    pub fn empty(month: YearMonth) -> Self {
        Self {
            month,
            order_count: 0,
            order_value: Decimal::ZERO,
            returned_value: Decimal::ZERO,
            review_count: 0,
            referral_count: 0,
        }
    }

    /// Order value minus returns, never below zero.
    pub fn net_spend(&self) -> Decimal {
        (self.order_value - self.returned_value).max(Decimal::ZERO)
    }

    fn add(&mut self, activity: &Activity) {
        match activity.activity_type {
            ActivityType::Order => {
                self.order_count = self.order_count.saturating_add(1);
                self.order_value += activity.value;
            }
            ActivityType::Return => self.returned_value += activity.value,
            ActivityType::Review => self.review_count = self.review_count.saturating_add(1),
            ActivityType::Referral => {
                self.referral_count = self.referral_count.saturating_add(1)
            }
        }
    }
}

/// Evaluation inputs derived from an aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityMetrics {
    /// ORDER count over the order window, evaluation month included.
    pub orders_in_window: u32,
    /// Net spend in the evaluation month.
    pub monthly_spend: Decimal,
}

impl EligibilityMetrics {
    pub fn new(orders_in_window: u32, monthly_spend: Decimal) -> Self {
        Self {
            orders_in_window,
            monthly_spend,
        }
    }
}

/// Month-bucketed activity totals for one user.
///
/// Created lazily on the first activity; buckets older than the retention
/// window are dropped whenever a new activity is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityAggregate {
    user_id: UserId,
    buckets: BTreeMap<YearMonth, MonthBucket>,
    updated_at: Timestamp,
}

impl ActivityAggregate {
    pub fn new(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            buckets: BTreeMap::new(),
            updated_at: now,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn bucket(&self, month: YearMonth) -> Option<&MonthBucket> {
        self.buckets.get(&month)
    }

    /// Buckets in chronological order.
    pub fn buckets(&self) -> impl Iterator<Item = &MonthBucket> {
        self.buckets.values()
    }

    /// Adds `activity` to the bucket of the month it occurred in and prunes
    /// buckets before `retain_from`.
    pub fn apply(&mut self, activity: &Activity, retain_from: YearMonth, now: Timestamp) {
        let month = activity.month();
        if month >= retain_from {
            self.buckets
                .entry(month)
                .or_insert_with(|| MonthBucket::empty(month))
                .add(activity);
        }
        self.prune(retain_from);
        self.updated_at = now;
    }

    /// Drops buckets before `retain_from`.
    pub fn prune(&mut self, retain_from: YearMonth) {
        self.buckets = self.buckets.split_off(&retain_from);
    }

    /// Metrics as of `evaluation_month`, counting orders over the
    /// `order_window_months` months ending there.
    pub fn metrics(&self, evaluation_month: YearMonth, order_window_months: u32) -> EligibilityMetrics {
        let window_start = evaluation_month.minus_months(order_window_months.saturating_sub(1));
        let orders_in_window = self
            .buckets
            .range(window_start..=evaluation_month)
            .map(|(_, bucket)| bucket.order_count)
            .fold(0u32, u32::saturating_add);
        let monthly_spend = self
            .buckets
            .get(&evaluation_month)
            .map(MonthBucket::net_spend)
            .unwrap_or(Decimal::ZERO);

        EligibilityMetrics {
            orders_in_window,
            monthly_spend,
        }
    }
}
