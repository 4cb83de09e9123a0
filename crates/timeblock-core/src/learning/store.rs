//! In-memory learning store and its derived queries.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use super::records::{
    DurationEstimate, RescheduleEvent, RescheduleReason, TimeOfDayPreference, TimePeriod,
};
use super::signature::{keyword_signature, LearningKey};
use crate::schedule::Task;

/// Minimum qualifying samples before any learned signal applies.
pub const MIN_SAMPLES: usize = 3;
/// Rolling history window for reschedule-derived signals.
pub const ROLLING_WINDOW_DAYS: i64 = 30;

const DURATION_MULTIPLIER_STRONG: f64 = 1.5;
const DURATION_MULTIPLIER_MILD: f64 = 1.25;
const MAX_DURATION_MULTIPLIER: f64 = 2.0;
const SPLIT_MIN_MINUTES: i64 = 30;
const SPLIT_MIN_INTERRUPTIONS: usize = 2;
const PENALTY_PER_EVENT: f64 = -0.1;
const MAX_PENALTY: f64 = -1.0;

/// Learned durations, time-of-day preferences and reschedule history.
///
/// Records are kept at two levels: the task's list alone, and the list
/// narrowed by the title's keyword signature. Queries prefer the
/// signature level once it has enough samples.
#[derive(Debug, Clone, Default)]
pub struct LearningStore {
    durations: BTreeMap<LearningKey, DurationEstimate>,
    preferences: BTreeMap<LearningKey, TimeOfDayPreference>,
    events: Vec<RescheduleEvent>,
}

impl LearningStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted rows.
    pub fn from_parts(
        durations: Vec<DurationEstimate>,
        preferences: Vec<TimeOfDayPreference>,
        mut events: Vec<RescheduleEvent>,
    ) -> Self {
        events.sort_by_key(|e| e.timestamp);
        Self {
            durations: durations.into_iter().map(|d| (d.key(), d)).collect(),
            preferences: preferences.into_iter().map(|p| (p.key(), p)).collect(),
            events,
        }
    }

    pub fn duration_estimates(&self) -> impl Iterator<Item = &DurationEstimate> {
        self.durations.values()
    }

    pub fn time_preferences(&self) -> impl Iterator<Item = &TimeOfDayPreference> {
        self.preferences.values()
    }

    pub fn events(&self) -> &[RescheduleEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty() && self.preferences.is_empty() && self.events.is_empty()
    }

    /// Both keys a task's records are filed under, signature level first.
    fn keys_for(task: &Task) -> Vec<LearningKey> {
        let mut keys = Vec::with_capacity(2);
        if let Some(key) = LearningKey::for_title(&task.list_name, &task.title) {
            keys.push(key);
        }
        keys.push(LearningKey::list(&task.list_name));
        keys
    }

    /// Record that `task` took `actual` and finished at `completed_at`.
    pub fn record_completion(&mut self, task: &Task, actual: Duration, completed_at: DateTime<Utc>) {
        let minutes = actual.num_minutes().max(0);
        let period = TimePeriod::of(completed_at - actual);

        for key in Self::keys_for(task) {
            self.durations
                .entry(key.clone())
                .or_insert_with(|| DurationEstimate::new(&key))
                .append(minutes);
            self.preferences
                .entry(key.clone())
                .or_insert_with(|| TimeOfDayPreference::new(&key))
                .record_success(period);
        }

        tracing::debug!(
            task_id = %task.id,
            list = %task.list_name,
            minutes,
            period = period.as_str(),
            "recorded completion"
        );
    }

    /// Record that a scheduled block for `task` was moved.
    pub fn record_reschedule(
        &mut self,
        task: &Task,
        reason: RescheduleReason,
        scheduled_start: DateTime<Utc>,
        scheduled_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        let key = LearningKey::new(&task.list_name, keyword_signature(&task.title));
        self.events.push(RescheduleEvent::new(
            &key,
            task.id.clone(),
            reason,
            scheduled_start,
            scheduled_end,
            now,
        ));

        if reason == RescheduleReason::BadTime {
            let period = TimePeriod::of(scheduled_start);
            for key in Self::keys_for(task) {
                self.preferences
                    .entry(key.clone())
                    .or_insert_with(|| TimeOfDayPreference::new(&key))
                    .record_failure(period);
            }
        }

        tracing::debug!(
            task_id = %task.id,
            list = %task.list_name,
            reason = reason.as_str(),
            "recorded reschedule"
        );
    }

    fn in_window(event: &RescheduleEvent, now: DateTime<Utc>) -> bool {
        event.timestamp <= now && event.timestamp >= now - Duration::days(ROLLING_WINDOW_DAYS)
    }

    /// Events for `task` with `reason` inside the window.
    ///
    /// Signature-matched events are used when there are at least
    /// [`MIN_SAMPLES`]; otherwise every event of the list counts.
    fn matching_events(
        &self,
        task: &Task,
        reason: RescheduleReason,
        now: DateTime<Utc>,
    ) -> Vec<&RescheduleEvent> {
        let list_events: Vec<&RescheduleEvent> = self
            .events
            .iter()
            .filter(|e| e.reason == reason && e.list_name == task.list_name && Self::in_window(e, now))
            .collect();

        if let Some(signature) = keyword_signature(&task.title) {
            let by_signature: Vec<&RescheduleEvent> = list_events
                .iter()
                .copied()
                .filter(|e| e.keyword_signature.as_deref() == Some(signature.as_str()))
                .collect();
            if by_signature.len() >= MIN_SAMPLES {
                return by_signature;
            }
        }
        list_events
    }

    fn reason_count(&self, task: &Task, reason: RescheduleReason, now: DateTime<Utc>) -> usize {
        self.matching_events(task, reason, now).len()
    }

    /// Multiplier for the base duration from "too long" history.
    pub fn duration_adjustment(&self, task: &Task, now: DateTime<Utc>) -> f64 {
        let count = self.reason_count(task, RescheduleReason::TooLong, now);
        let multiplier = if count >= MIN_SAMPLES {
            DURATION_MULTIPLIER_STRONG
        } else if count >= 2 {
            DURATION_MULTIPLIER_MILD
        } else {
            1.0
        };
        multiplier.min(MAX_DURATION_MULTIPLIER)
    }

    /// `base` scaled by [`duration_adjustment`](Self::duration_adjustment),
    /// rounded to whole minutes.
    pub fn adjusted_duration(&self, task: &Task, base: Duration, now: DateTime<Utc>) -> Duration {
        let factor = self.duration_adjustment(task, now);
        if factor == 1.0 {
            return base;
        }
        let minutes = (base.num_minutes() as f64 * factor).round() as i64;
        let Some(adjusted) = Duration::try_minutes(minutes) else {
            tracing::warn!(task_id = %task.id, minutes, "adjusted duration out of range, keeping base");
            return base;
        };
        tracing::debug!(
            task_id = %task.id,
            factor,
            from = base.num_minutes(),
            to = minutes,
            "lengthening block from too-long history"
        );
        adjusted
    }

    /// Whether a block of `duration` should be split in two.
    pub fn should_split(&self, task: &Task, duration: Duration, now: DateTime<Utc>) -> bool {
        duration.num_minutes() > SPLIT_MIN_MINUTES
            && self.reason_count(task, RescheduleReason::Interrupted, now) >= SPLIT_MIN_INTERRUPTIONS
    }

    /// Extra buffer on top of the configured one, from interruption history.
    pub fn buffer_recommendation(&self, task: &Task, now: DateTime<Utc>) -> Duration {
        match self.reason_count(task, RescheduleReason::Interrupted, now) {
            n if n >= MIN_SAMPLES => Duration::minutes(10),
            2 => Duration::minutes(5),
            _ => Duration::zero(),
        }
    }

    /// Zero or negative; more negative for tasks repeatedly skipped.
    pub fn priority_penalty(&self, task: &Task, now: DateTime<Utc>) -> f64 {
        let count = self.reason_count(task, RescheduleReason::NotImportant, now);
        if count < MIN_SAMPLES {
            return 0.0;
        }
        (PENALTY_PER_EVENT * count as f64).max(MAX_PENALTY)
    }

    fn preference_for(&self, task: &Task) -> Option<&TimeOfDayPreference> {
        Self::keys_for(task)
            .iter()
            .filter_map(|key| self.preferences.get(key))
            .find(|p| p.sample_count as usize >= MIN_SAMPLES)
    }

    /// Learned suitability of `instant`'s period for `task`; 0 without data.
    pub fn time_of_day_score(&self, task: &Task, instant: DateTime<Utc>) -> f64 {
        self.preference_for(task)
            .map(|p| p.score(TimePeriod::of(instant)))
            .unwrap_or(0.0)
    }

    /// Average learned duration, when enough completions are on record.
    pub fn learned_duration(&self, task: &Task) -> Option<Duration> {
        Self::keys_for(task)
            .iter()
            .filter_map(|key| self.durations.get(key))
            .find(|d| d.sample_count() >= MIN_SAMPLES)
            .map(|d| Duration::minutes(d.average_minutes.round() as i64))
    }

    /// Events of any list inside the window ending at `now`.
    pub(crate) fn recent_events(&self, now: DateTime<Utc>) -> impl Iterator<Item = &RescheduleEvent> {
        self.events.iter().filter(move |e| Self::in_window(e, now))
    }

    /// List-level duration estimates.
    pub(crate) fn list_estimates(&self) -> impl Iterator<Item = &DurationEstimate> {
        self.durations.values().filter(|d| d.keyword_signature.is_none())
    }
}
