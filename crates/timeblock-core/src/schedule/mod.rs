//! Schedule types shared by every engine component.
//!
//! Tasks come in from the reminder provider, busy intervals from the
//! calendar provider, and scheduled blocks go back out. Slots are the
//! ephemeral free intervals a single run works on.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// User-facing task priority.
///
/// The ordinal is what the prioritizer adds to a due-date bucket, so a
/// lower ordinal sorts earlier within the same bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
    #[default]
    None,
}

impl TaskPriority {
    pub fn ordinal(self) -> i64 {
        match self {
            Self::High => 1,
            Self::Medium => 5,
            Self::Low => 9,
            Self::None => 99,
        }
    }

    /// Map a reminder-provider ordinal (0 = none, 1-4 high, 5 medium, 6-9 low).
    pub fn from_ordinal(ordinal: i64) -> Self {
        match ordinal {
            1..=4 => Self::High,
            5 => Self::Medium,
            6..=9 => Self::Low,
            _ => Self::None,
        }
    }
}

/// Cognitive energy a slot offers or a task needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnergyLevel {
    HighFocus,
    #[default]
    Medium,
    Low,
}

impl EnergyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighFocus => "high_focus",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// How to pick among several slots that can hold a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotPreference {
    #[default]
    MorningFirst,
    AfternoonFirst,
    SpreadEvenly,
}

/// An open task to be placed on the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub list_name: String,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Free text; may carry a `[duration:1h30m]` hint.
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub energy_requirement: EnergyLevel,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        list_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            list_name: list_name.into(),
            priority: TaskPriority::None,
            due_date: None,
            notes: String::new(),
            energy_requirement: EnergyLevel::Medium,
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_energy(mut self, energy: EnergyLevel) -> Self {
        self.energy_requirement = energy;
        self
    }

    /// Duration hint embedded in the notes, if well-formed.
    pub fn duration_hint(&self) -> Option<Duration> {
        parse_duration_hint(&self.notes)
    }
}

fn duration_hint_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\[duration:\s*(?:(\d+)\s*h)?\s*(?:(\d+)\s*m)?\s*\]")
            .expect("duration hint pattern is valid")
    })
}

/// Parse `[duration:<H>h<M>m]` out of free text.
///
/// Either component may be omitted. Returns `None` for a missing, empty,
/// zero-length or unrepresentably long hint so callers fall back to their
/// default.
pub fn parse_duration_hint(notes: &str) -> Option<Duration> {
    let caps = duration_hint_regex().captures(notes)?;
    let hours: i64 = caps.get(1).map_or(Ok(0), |m| m.as_str().parse::<i64>()).ok()?;
    let minutes: i64 = caps.get(2).map_or(Ok(0), |m| m.as_str().parse::<i64>()).ok()?;
    let total = hours.checked_mul(60)?.checked_add(minutes)?;
    if total <= 0 {
        return None;
    }
    Duration::try_minutes(total)
}

/// Parse an "HH:MM" clock time.
pub fn parse_clock(value: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| ValidationError::InvalidTimeOfDay(value.to_string()))
}

/// A contiguous free interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub energy: Option<EnergyLevel>,
}

impl TimeSlot {
    /// Create a slot; `None` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self {
            start,
            end,
            energy: None,
        })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn can_fit(&self, duration: Duration) -> bool {
        self.duration() >= duration
    }

    pub fn midpoint(&self) -> DateTime<Utc> {
        self.start + self.duration() / 2
    }
}

/// A range already occupied by an existing commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            all_day: false,
        }
    }

    pub fn all_day(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            all_day: true,
        }
    }

    /// Check if this interval overlaps a half-open range
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }
}

/// One placed block of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledBlock {
    pub task_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Minutes.
    pub duration: i64,
    /// 1-based, only for split tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_blocks: Option<u32>,
}

impl ScheduledBlock {
    pub fn overlaps(&self, other: &ScheduledBlock) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A task that was selected for this run but could not be fully placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnscheduledTask {
    pub task_id: String,
    pub title: String,
    pub missing_blocks: u32,
    pub total_blocks: u32,
}

/// Output of one scheduling run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePlan {
    pub blocks: Vec<ScheduledBlock>,
    pub unscheduled: Vec<UnscheduledTask>,
}

impl SchedulePlan {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks belonging to one task, in placement order.
    pub fn blocks_for<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a ScheduledBlock> {
        self.blocks.iter().filter(move |b| b.task_id == task_id)
    }
}
