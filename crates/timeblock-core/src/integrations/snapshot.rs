//! JSON snapshot of tasks and calendar, read from a file.
//!
//! ```json
//! {
//!   "tasks": [
//!     {"id": "r1", "title": "Write report", "list": "Work", "priority": 1,
//!      "due_date": "2026-03-06T17:00:00Z", "notes": "[duration:1h30m]",
//!      "energy": "high_focus"}
//!   ],
//!   "busy": [
//!     {"start": "2026-03-02T12:00:00Z", "end": "2026-03-02T13:00:00Z"}
//!   ]
//! }
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::traits::{CalendarProvider, ReminderProvider};
use crate::error::CoreError;
use crate::schedule::{BusyInterval, EnergyLevel, Task, TaskPriority};

/// A task as reminder apps export it: priority is a raw ordinal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTask {
    pub id: String,
    pub title: String,
    #[serde(alias = "list_name")]
    pub list: String,
    /// 0 = none, 1-4 high, 5 medium, 6-9 low
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, alias = "energy_requirement")]
    pub energy: EnergyLevel,
    #[serde(default)]
    pub completed: bool,
}

impl From<SnapshotTask> for Task {
    fn from(t: SnapshotTask) -> Self {
        Task {
            id: t.id,
            title: t.title,
            list_name: t.list,
            priority: TaskPriority::from_ordinal(t.priority),
            due_date: t.due_date,
            notes: t.notes,
            energy_requirement: t.energy,
        }
    }
}

/// Calendar and reminders backed by one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotProvider {
    #[serde(default)]
    pub tasks: Vec<SnapshotTask>,
    #[serde(default)]
    pub busy: Vec<BusyInterval>,
}

impl SnapshotProvider {
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a snapshot file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid snapshot.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&content)?;
        tracing::debug!(
            path = %path.display(),
            tasks = snapshot.tasks.len(),
            busy = snapshot.busy.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }
}

impl CalendarProvider for SnapshotProvider {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn busy_intervals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CoreError> {
        Ok(self
            .busy
            .iter()
            .filter(|b| b.overlaps(start, end))
            .copied()
            .collect())
    }
}

impl ReminderProvider for SnapshotProvider {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn open_tasks(&self) -> Result<Vec<Task>, CoreError> {
        Ok(self
            .tasks
            .iter()
            .filter(|t| !t.completed)
            .cloned()
            .map(Task::from)
            .collect())
    }
}
