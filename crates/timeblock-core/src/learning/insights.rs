//! Human-readable summaries of recent learning history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::records::{RescheduleEvent, RescheduleReason, TimePeriod};
use super::store::{LearningStore, MIN_SAMPLES, ROLLING_WINDOW_DAYS};

const LONG_BLOCK_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    RunsLong,
    BadTiming,
    LongTasksInterrupted,
    FrequentlySkipped,
    TypicalDuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub list_name: String,
    pub count: usize,
    pub message: String,
}

#[derive(Default)]
struct ListTally<'a> {
    too_long: usize,
    bad_time: Vec<&'a RescheduleEvent>,
    long_interrupted: usize,
    not_important: usize,
}

fn most_common_period(events: &[&RescheduleEvent]) -> TimePeriod {
    let mut counts = [0usize; 3];
    for e in events {
        let idx = TimePeriod::ALL
            .iter()
            .position(|p| *p == TimePeriod::from_hour(e.hour_of_day))
            .unwrap_or(0);
        counts[idx] += 1;
    }
    // first period wins ties
    let mut best = 0;
    for (i, c) in counts.iter().enumerate() {
        if *c > counts[best] {
            best = i;
        }
    }
    TimePeriod::ALL[best]
}

impl LearningStore {
    /// Summaries for every list whose recent history crosses a threshold.
    ///
    /// Lists are reported in name order; within a list the order is
    /// too long, bad timing, interruptions, skips, typical duration.
    pub fn generate_insights(&self, now: DateTime<Utc>) -> Vec<Insight> {
        let mut tallies: BTreeMap<&str, ListTally> = BTreeMap::new();
        for event in self.recent_events(now) {
            let tally = tallies.entry(event.list_name.as_str()).or_default();
            match event.reason {
                RescheduleReason::TooLong => tally.too_long += 1,
                RescheduleReason::BadTime => tally.bad_time.push(event),
                RescheduleReason::Interrupted => {
                    if event.scheduled_minutes() > LONG_BLOCK_MINUTES {
                        tally.long_interrupted += 1;
                    }
                }
                RescheduleReason::NotImportant => tally.not_important += 1,
            }
        }
        for estimate in self.list_estimates() {
            tallies.entry(estimate.list_name.as_str()).or_default();
        }

        let mut insights = Vec::new();
        for (list, tally) in &tallies {
            let list_name = list.to_string();
            if tally.too_long >= 2 {
                insights.push(Insight {
                    kind: InsightKind::RunsLong,
                    list_name: list_name.clone(),
                    count: tally.too_long,
                    message: format!(
                        "Tasks in '{list}' ran over their block {} times in the last {ROLLING_WINDOW_DAYS} days; new blocks will be scheduled longer.",
                        tally.too_long
                    ),
                });
            }
            if tally.bad_time.len() >= 2 {
                let period = most_common_period(&tally.bad_time);
                insights.push(Insight {
                    kind: InsightKind::BadTiming,
                    list_name: list_name.clone(),
                    count: tally.bad_time.len(),
                    message: format!(
                        "{} blocks in '{list}' were moved for bad timing, mostly in the {}.",
                        tally.bad_time.len(),
                        period.as_str()
                    ),
                });
            }
            if tally.long_interrupted >= 2 {
                insights.push(Insight {
                    kind: InsightKind::LongTasksInterrupted,
                    list_name: list_name.clone(),
                    count: tally.long_interrupted,
                    message: format!(
                        "{} blocks over {LONG_BLOCK_MINUTES} minutes in '{list}' were interrupted; long tasks will be split.",
                        tally.long_interrupted
                    ),
                });
            }
            if tally.not_important >= MIN_SAMPLES {
                insights.push(Insight {
                    kind: InsightKind::FrequentlySkipped,
                    list_name: list_name.clone(),
                    count: tally.not_important,
                    message: format!(
                        "Tasks in '{list}' were skipped as not important {} times; they will be scheduled later.",
                        tally.not_important
                    ),
                });
            }
            if let Some(estimate) = self
                .list_estimates()
                .find(|d| d.list_name == *list && d.sample_count() >= MIN_SAMPLES)
            {
                insights.push(Insight {
                    kind: InsightKind::TypicalDuration,
                    list_name,
                    count: estimate.sample_count(),
                    message: format!(
                        "Tasks in '{list}' take about {} minutes on average.",
                        estimate.average_minutes.round() as i64
                    ),
                });
            }
        }
        insights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Task;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 18, 0, 0).unwrap()
    }

    fn reschedule(store: &mut LearningStore, task: &Task, reason: RescheduleReason, hour: u32, minutes: i64) {
        let start = Utc.with_ymd_and_hms(2026, 3, 3, hour, 0, 0).unwrap();
        store.record_reschedule(task, reason, start, start + Duration::minutes(minutes), start);
    }

    #[test]
    fn empty_store_has_no_insights() {
        assert!(LearningStore::new().generate_insights(now()).is_empty());
    }

    #[test]
    fn thresholds_per_category() {
        let mut store = LearningStore::new();
        let work = Task::new("w", "Write report", "Work");
        let home = Task::new("h", "Fold laundry", "Home");

        reschedule(&mut store, &work, RescheduleReason::TooLong, 9, 30);
        reschedule(&mut store, &work, RescheduleReason::TooLong, 10, 30);
        reschedule(&mut store, &work, RescheduleReason::BadTime, 14, 30);
        reschedule(&mut store, &work, RescheduleReason::BadTime, 15, 30);
        reschedule(&mut store, &work, RescheduleReason::BadTime, 9, 30);
        // one long, one short interruption: below threshold
        reschedule(&mut store, &work, RescheduleReason::Interrupted, 9, 60);
        reschedule(&mut store, &work, RescheduleReason::Interrupted, 9, 20);
        reschedule(&mut store, &home, RescheduleReason::NotImportant, 19, 30);
        reschedule(&mut store, &home, RescheduleReason::NotImportant, 19, 30);

        let insights = store.generate_insights(now());
        let kinds: Vec<_> = insights.iter().map(|i| (i.list_name.as_str(), i.kind)).collect();
        assert_eq!(
            kinds,
            vec![("Work", InsightKind::RunsLong), ("Work", InsightKind::BadTiming)]
        );
        assert!(insights[1].message.contains("afternoon"));
        assert_eq!(insights[1].count, 3);
    }

    #[test]
    fn long_interruptions_and_skips() {
        let mut store = LearningStore::new();
        let task = Task::new("t", "Deep work", "Focus");
        reschedule(&mut store, &task, RescheduleReason::Interrupted, 9, 45);
        reschedule(&mut store, &task, RescheduleReason::Interrupted, 10, 90);
        for _ in 0..3 {
            reschedule(&mut store, &task, RescheduleReason::NotImportant, 11, 30);
        }
        let kinds: Vec<_> = store.generate_insights(now()).into_iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![InsightKind::LongTasksInterrupted, InsightKind::FrequentlySkipped]
        );
    }

    #[test]
    fn typical_duration_from_completions() {
        let mut store = LearningStore::new();
        let done = Utc.with_ymd_and_hms(2026, 3, 3, 11, 0, 0).unwrap();
        for minutes in [20, 25, 30] {
            store.record_completion(&Task::new("e", "Email triage", "Admin"), Duration::minutes(minutes), done);
        }
        let insights = store.generate_insights(now());
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::TypicalDuration);
        assert!(insights[0].message.contains("25 minutes"));
    }
}
