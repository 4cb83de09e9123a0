use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::schedule::{BusyInterval, Task};

/// Source of existing commitments.
pub trait CalendarProvider {
    /// Unique identifier (e.g. "snapshot").
    fn name(&self) -> &str;

    /// Busy intervals overlapping `[start, end)`, all-day entries flagged.
    fn busy_intervals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CoreError>;
}

/// Source of open tasks.
pub trait ReminderProvider {
    /// Unique identifier (e.g. "snapshot").
    fn name(&self) -> &str;

    /// Every task that is not completed.
    fn open_tasks(&self) -> Result<Vec<Task>, CoreError>;
}
