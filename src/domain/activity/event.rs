//! Activity events and the rules that admit them.

use chrono::Duration;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::foundation::{Timestamp, UserId, YearMonth};

/// Kind of user activity the aggregator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    /// A completed order; counts towards orders and spend.
    Order,
    /// A returned order; its value is deducted from the month's spend.
    Return,
    Review,
    Referral,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Order => "ORDER",
            ActivityType::Return => "RETURN",
            ActivityType::Review => "REVIEW",
            ActivityType::Referral => "REFERRAL",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = ActivityRejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ORDER" => Ok(ActivityType::Order),
            "RETURN" => Ok(ActivityType::Return),
            "REVIEW" => Ok(ActivityType::Review),
            "REFERRAL" => Ok(ActivityType::Referral),
            _ => Err(ActivityRejection::UnknownType(s.to_string())),
        }
    }
}

/// Why an activity was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActivityRejection {
    #[error("unknown activity type '{0}'")]
    UnknownType(String),

    #[error("activity value must be a finite number")]
    NonFiniteValue,

    #[error("activity value must not be negative, got {0}")]
    NegativeValue(f64),

    #[error("activity value {value} exceeds the maximum of {max}")]
    ValueTooLarge { value: Decimal, max: Decimal },

    #[error("activity from {month} is older than the retention window starting {oldest}")]
    TooOld { month: YearMonth, oldest: YearMonth },

    #[error("activity timestamp {0:?} is too far in the future")]
    InFuture(Timestamp),
}

/// A single validated activity event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub user_id: UserId,
    pub activity_type: ActivityType,
    pub value: Decimal,
    pub occurred_at: Timestamp,
}

impl Activity {
    /// Creates an activity, rejecting negative and non-finite values.
    pub fn new(
        user_id: UserId,
        activity_type: ActivityType,
        value: f64,
        occurred_at: Timestamp,
    ) -> Result<Self, ActivityRejection> {
        if !value.is_finite() {
            return Err(ActivityRejection::NonFiniteValue);
        }
        if value < 0.0 {
            return Err(ActivityRejection::NegativeValue(value));
        }
        let value = Decimal::from_f64(value).ok_or(ActivityRejection::NonFiniteValue)?;

        Ok(Self {
            user_id,
            activity_type,
            value,
            occurred_at,
        })
    }

    /// Calendar month the activity is bucketed into.
    pub fn month(&self) -> YearMonth {
        self.occurred_at.year_month()
    }
}

/// Limits applied to incoming activity relative to the ingestion clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityPolicy {
    pub max_value: Decimal,
    pub retention_months: u32,
    pub max_future_skew: Duration,
}

impl ActivityPolicy {
    pub fn new(max_value: Decimal, retention_months: u32) -> Self {
        Self {
            max_value,
            retention_months,
            max_future_skew: Duration::days(1),
        }
    }

    /// Oldest month still inside the retention window (the current month
    /// counts as the first).
    pub fn retention_start(&self, now: Timestamp) -> YearMonth {
        now.year_month()
            .minus_months(self.retention_months.saturating_sub(1))
    }

    /// Checks value ceiling and timestamp bounds.
    pub fn admit(&self, activity: &Activity, now: Timestamp) -> Result<(), ActivityRejection> {
        if activity.value > self.max_value {
            return Err(ActivityRejection::ValueTooLarge {
                value: activity.value,
                max: self.max_value,
            });
        }

        let latest = Timestamp::from_datetime(*now.as_datetime() + self.max_future_skew);
        if activity.occurred_at.is_after(&latest) {
            return Err(ActivityRejection::InFuture(activity.occurred_at));
        }

        let oldest = self.retention_start(now);
        if activity.month() < oldest {
            return Err(ActivityRejection::TooOld {
                month: activity.month(),
                oldest,
            });
        }
        Ok(())
    }
}
