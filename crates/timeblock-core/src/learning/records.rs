//! Learned record types.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::signature::LearningKey;

/// Most recent duration samples kept per key.
pub const MAX_DURATION_SAMPLES: usize = 20;

/// Coarse part of the day used for time-of-day learning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    /// 05:00-11:59
    Morning,
    /// 12:00-16:59
    Afternoon,
    /// 17:00-04:59
    Evening,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 3] = [Self::Morning, Self::Afternoon, Self::Evening];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    pub fn of(instant: DateTime<Utc>) -> Self {
        Self::from_hour(instant.hour())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }
}

/// Why a scheduled block did not work out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleReason {
    TooLong,
    BadTime,
    Interrupted,
    NotImportant,
}

impl RescheduleReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TooLong => "too_long",
            Self::BadTime => "bad_time",
            Self::Interrupted => "interrupted",
            Self::NotImportant => "not_important",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "too_long" => Some(Self::TooLong),
            "bad_time" => Some(Self::BadTime),
            "interrupted" => Some(Self::Interrupted),
            "not_important" => Some(Self::NotImportant),
            _ => None,
        }
    }
}

/// Rolling record of how long work on a key actually took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationEstimate {
    pub list_name: String,
    pub keyword_signature: Option<String>,
    /// Minutes, oldest first.
    pub samples: Vec<i64>,
    pub average_minutes: f64,
}

impl DurationEstimate {
    pub fn new(key: &LearningKey) -> Self {
        Self {
            list_name: key.list_name.clone(),
            keyword_signature: key.signature.clone(),
            samples: Vec::new(),
            average_minutes: 0.0,
        }
    }

    pub fn key(&self) -> LearningKey {
        LearningKey::new(&self.list_name, self.keyword_signature.clone())
    }

    /// Append a sample, dropping the oldest once past the cap.
    pub fn append(&mut self, minutes: i64) {
        self.samples.push(minutes);
        if self.samples.len() > MAX_DURATION_SAMPLES {
            let excess = self.samples.len() - MAX_DURATION_SAMPLES;
            self.samples.drain(..excess);
        }
        self.average_minutes =
            self.samples.iter().sum::<i64>() as f64 / self.samples.len() as f64;
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// Success/failure accumulators per part of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOfDayPreference {
    pub list_name: String,
    pub keyword_signature: Option<String>,
    pub morning: f64,
    pub afternoon: f64,
    pub evening: f64,
    pub sample_count: u32,
}

impl TimeOfDayPreference {
    pub fn new(key: &LearningKey) -> Self {
        Self {
            list_name: key.list_name.clone(),
            keyword_signature: key.signature.clone(),
            morning: 0.0,
            afternoon: 0.0,
            evening: 0.0,
            sample_count: 0,
        }
    }

    pub fn key(&self) -> LearningKey {
        LearningKey::new(&self.list_name, self.keyword_signature.clone())
    }

    fn slot_mut(&mut self, period: TimePeriod) -> &mut f64 {
        match period {
            TimePeriod::Morning => &mut self.morning,
            TimePeriod::Afternoon => &mut self.afternoon,
            TimePeriod::Evening => &mut self.evening,
        }
    }

    pub fn accumulator(&self, period: TimePeriod) -> f64 {
        match period {
            TimePeriod::Morning => self.morning,
            TimePeriod::Afternoon => self.afternoon,
            TimePeriod::Evening => self.evening,
        }
    }

    pub fn record_success(&mut self, period: TimePeriod) {
        *self.slot_mut(period) += 1.0;
        self.sample_count += 1;
    }

    /// Penalize `period` by 1 and credit the other two by 0.5 each.
    pub fn record_failure(&mut self, period: TimePeriod) {
        for p in TimePeriod::ALL {
            *self.slot_mut(p) += if p == period { -1.0 } else { 0.5 };
        }
        self.sample_count += 1;
    }

    /// Accumulator normalized by sample count.
    pub fn score(&self, period: TimePeriod) -> f64 {
        if self.sample_count == 0 {
            return 0.0;
        }
        self.accumulator(period) / self.sample_count as f64
    }
}

/// Append-only record of a reschedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleEvent {
    pub id: String,
    pub task_id: String,
    pub list_name: String,
    pub keyword_signature: Option<String>,
    pub reason: RescheduleReason,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub hour_of_day: u32,
    /// 0 = Sunday
    pub day_of_week: u32,
    pub timestamp: DateTime<Utc>,
}

impl RescheduleEvent {
    pub fn new(
        key: &LearningKey,
        task_id: impl Into<String>,
        reason: RescheduleReason,
        scheduled_start: DateTime<Utc>,
        scheduled_end: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            list_name: key.list_name.clone(),
            keyword_signature: key.signature.clone(),
            reason,
            scheduled_start,
            scheduled_end,
            hour_of_day: scheduled_start.hour(),
            day_of_week: scheduled_start.weekday().num_days_from_sunday(),
            timestamp,
        }
    }

    pub fn scheduled_minutes(&self) -> i64 {
        (self.scheduled_end - self.scheduled_start).num_minutes()
    }
}
