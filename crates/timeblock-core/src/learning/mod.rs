//! Learning from completions and reschedules.
//!
//! Durations, time-of-day preferences and reschedule history feed back
//! into prioritization and placement on later runs.

mod insights;
mod records;
mod signature;
mod store;

pub use insights::{Insight, InsightKind};
pub use records::{
    DurationEstimate, RescheduleEvent, RescheduleReason, TimeOfDayPreference, TimePeriod,
    MAX_DURATION_SAMPLES,
};
pub use signature::{keyword_signature, LearningKey};
pub use store::{LearningStore, MIN_SAMPLES, ROLLING_WINDOW_DAYS};
