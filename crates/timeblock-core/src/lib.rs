//! # Timeblock Core Library
//!
//! This library provides the core logic for the timeblock auto-scheduler:
//! given open tasks and an existing calendar, it proposes time blocks for
//! the most urgent work and learns from how those blocks actually went.
//! The `timeblock` CLI is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Timeline**: Free-slot arithmetic over busy intervals, and task urgency scoring
//! - **Energy**: Energy blocks across the day and energy-aware slot choice
//! - **Learning**: Duration, time-of-day and reschedule history with derived adjustments
//! - **Scheduler**: The greedy engine tying the above together
//! - **Storage**: SQLite-based learning persistence and TOML-based configuration
//! - **Integrations**: Calendar and reminder provider traits, plus a JSON snapshot provider
//!
//! ## Key Components
//!
//! - [`SchedulingEngine`]: Computes a [`SchedulePlan`] for a window
//! - [`LearningStore`]: Feedback hooks and learned adjustments
//! - [`LearningDb`]: Learning persistence
//! - [`Config`]: Application configuration management

pub mod energy;
pub mod error;
pub mod integrations;
pub mod learning;
pub mod schedule;
pub mod scheduler;
pub mod storage;
pub mod timeline;

pub use energy::{EnergyBlock, EnergyMatcher};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use integrations::{CalendarProvider, ReminderProvider, SnapshotProvider};
pub use learning::{Insight, InsightKind, LearningStore, RescheduleReason};
pub use schedule::{
    BusyInterval, EnergyLevel, ScheduledBlock, SchedulePlan, SlotPreference, Task, TaskPriority,
    TimeSlot, UnscheduledTask,
};
pub use scheduler::{ScheduleWindow, SchedulingEngine, SchedulingSettings};
pub use storage::{Config, LearningDb};
pub use timeline::{SlotFinder, TaskPrioritizer};
