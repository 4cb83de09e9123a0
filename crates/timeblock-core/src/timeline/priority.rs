//! Task urgency scoring.
//!
//! Scores are ascending: the lowest score is scheduled first. Tasks fall
//! into due-date buckets, and the priority ordinal orders tasks within a
//! bucket:
//!
//! - Overdue: -1000 minus whole days overdue (capped at 999)
//! - Due today: ordinal
//! - Due this calendar week: 100 + ordinal
//! - Due later: 200 + ordinal
//! - No due date: 300 + ordinal
//!
//! A learned "not important" penalty pushes a task later by
//! `abs(penalty) * 100`.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::learning::LearningStore;
use crate::schedule::Task;

const OVERDUE_BASE: f64 = -1000.0;
const MAX_OVERDUE_DAYS: i64 = 999;
const WEEK_BUCKET: f64 = 100.0;
const LATER_BUCKET: f64 = 200.0;
const UNDATED_BUCKET: f64 = 300.0;
const PENALTY_SCALE: f64 = 100.0;

/// A task paired with its final urgency score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTask {
    pub task: Task,
    pub score: f64,
}

/// Orders tasks by urgency relative to a fixed `now`.
pub struct TaskPrioritizer<'a> {
    now: DateTime<Utc>,
    learning: Option<&'a LearningStore>,
}

impl<'a> TaskPrioritizer<'a> {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            learning: None,
        }
    }

    /// Apply learned deprioritization signals from `store`.
    pub fn with_learning(mut self, store: &'a LearningStore) -> Self {
        self.learning = Some(store);
        self
    }

    /// Due-date bucket plus priority ordinal, before learned adjustments.
    pub fn base_score(&self, task: &Task) -> f64 {
        let ordinal = task.priority.ordinal() as f64;
        let Some(due) = task.due_date else {
            return UNDATED_BUCKET + ordinal;
        };

        if due < self.now {
            let days_overdue = (self.now - due).num_days().min(MAX_OVERDUE_DAYS);
            return OVERDUE_BASE - days_overdue as f64;
        }

        let today = self.now.date_naive();
        let due_day = due.date_naive();
        if due_day == today {
            ordinal
        } else if due_day.iso_week() == today.iso_week() {
            WEEK_BUCKET + ordinal
        } else {
            LATER_BUCKET + ordinal
        }
    }

    /// Final score including the learned penalty.
    pub fn score(&self, task: &Task) -> f64 {
        let mut score = self.base_score(task);
        if let Some(store) = self.learning {
            let penalty = store.priority_penalty(task, self.now);
            if penalty < 0.0 {
                tracing::debug!(
                    task_id = %task.id,
                    penalty,
                    "deprioritizing task from not-important history"
                );
                score += penalty.abs() * PENALTY_SCALE;
            }
        }
        score
    }

    /// Sort ascending by score. Ties keep their input order.
    pub fn prioritize(&self, tasks: &[Task]) -> Vec<ScoredTask> {
        let mut scored: Vec<ScoredTask> = tasks
            .iter()
            .map(|task| ScoredTask {
                task: task.clone(),
                score: self.score(task),
            })
            .collect();
        scored.sort_by(|a, b| a.score.total_cmp(&b.score));
        scored
    }
}
