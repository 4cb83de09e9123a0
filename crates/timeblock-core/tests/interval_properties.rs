//! Property tests for free-slot arithmetic and scheduling invariants.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use timeblock_core::learning::RescheduleReason;
use timeblock_core::timeline::{apply_buffer, merge_overlapping, subtract};
use timeblock_core::{
    BusyInterval, LearningStore, ScheduleWindow, SchedulingEngine, SchedulingSettings, Task,
    TimeSlot,
};

fn base() -> DateTime<Utc> {
    // Monday
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

fn busy_strategy() -> impl Strategy<Value = Vec<BusyInterval>> {
    prop::collection::vec((0i64..600, 0i64..180), 0..12).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(offset, len)| {
                let start = base() + Duration::minutes(offset);
                BusyInterval::new(start, start + Duration::minutes(len))
            })
            .collect()
    })
}

fn window() -> TimeSlot {
    TimeSlot::new(base() + Duration::hours(1), base() + Duration::hours(9)).unwrap()
}

fn clipped_minutes(interval: &BusyInterval, window: &TimeSlot) -> i64 {
    let start = interval.start.max(window.start);
    let end = interval.end.min(window.end);
    (end - start).num_minutes().max(0)
}

proptest! {
    #[test]
    fn merge_is_sorted_disjoint_and_idempotent(busy in busy_strategy()) {
        let merged = merge_overlapping(&busy);
        for pair in merged.windows(2) {
            prop_assert!(pair[0].end < pair[1].start);
        }
        prop_assert!(merged.iter().all(|b| b.start < b.end));
        prop_assert_eq!(merge_overlapping(&merged), merged);
    }

    #[test]
    fn free_and_busy_cover_window(busy in busy_strategy()) {
        let w = window();
        let merged = merge_overlapping(&busy);
        let free = subtract(w, &merged);

        prop_assert!(free.iter().all(|s| s.start < s.end));
        let free_minutes: i64 = free.iter().map(|s| s.duration().num_minutes()).sum();
        let busy_minutes: i64 = merged.iter().map(|b| clipped_minutes(b, &w)).sum();
        prop_assert_eq!(free_minutes + busy_minutes, w.duration().num_minutes());
    }

    #[test]
    fn buffering_only_shrinks(busy in busy_strategy(), buffer in 0i64..30) {
        let merged = merge_overlapping(&busy);
        let free = subtract(window(), &merged);
        let buffered = apply_buffer(&free, &merged, Duration::minutes(buffer));
        prop_assert!(buffered.len() <= free.len());
        for slot in &buffered {
            prop_assert!(slot.start < slot.end);
            prop_assert!(free.iter().any(|f| f.start <= slot.start && slot.end <= f.end));
        }
    }

    #[test]
    fn schedule_blocks_never_overlap(
        busy in busy_strategy(),
        minutes in prop::collection::vec(10i64..150, 1..8),
        interruptions in 0usize..4,
    ) {
        let mut store = LearningStore::new();
        let tasks: Vec<Task> = minutes
            .iter()
            .enumerate()
            .map(|(i, m)| {
                Task::new(format!("t{i}"), format!("Task number {i}"), "Work")
                    .with_notes(format!("[duration:{m}m]"))
            })
            .collect();
        for i in 0..interruptions {
            let at = base() - Duration::days(i as i64 + 1);
            store.record_reschedule(&tasks[0], RescheduleReason::Interrupted, at, at + Duration::hours(1), at);
        }

        let window = ScheduleWindow::days_from(base(), 2, busy.clone()).unwrap();
        let settings = SchedulingSettings {
            max_suggestions: tasks.len(),
            ..SchedulingSettings::default()
        };
        let plan = SchedulingEngine::new(&store, base()).compute_schedule(&tasks, &window, &settings);

        for (i, a) in plan.blocks.iter().enumerate() {
            prop_assert!(a.start < a.end);
            prop_assert!(busy.iter().all(|b| !b.overlaps(a.start, a.end)));
            for b in &plan.blocks[i + 1..] {
                prop_assert!(!a.overlaps(b));
            }
        }
        let placed: std::collections::HashSet<_> = plan.blocks.iter().map(|b| b.task_id.as_str()).collect();
        for task in &tasks {
            let unscheduled = plan.unscheduled.iter().any(|u| u.task_id == task.id);
            prop_assert!(placed.contains(task.id.as_str()) || unscheduled);
        }
    }

    #[test]
    fn duration_adjustment_is_monotonic(count in 0usize..8) {
        let task = Task::new("t", "Write report", "Work");
        let now = base();
        let mut previous = 1.0;
        let mut store = LearningStore::new();
        for i in 0..count {
            let at = now - Duration::hours(i as i64 + 1);
            store.record_reschedule(&task, RescheduleReason::TooLong, at, at, at);
            let factor = store.duration_adjustment(&task, now);
            prop_assert!(factor >= previous);
            prop_assert!(factor <= 2.0);
            previous = factor;
        }
    }

    #[test]
    fn short_blocks_never_split(minutes in 1i64..=30, interruptions in 0usize..10) {
        let task = Task::new("t", "Write report", "Work");
        let now = base();
        let mut store = LearningStore::new();
        for i in 0..interruptions {
            let at = now - Duration::hours(i as i64 + 1);
            store.record_reschedule(&task, RescheduleReason::Interrupted, at, at, at);
        }
        prop_assert!(!store.should_split(&task, Duration::minutes(minutes), now));
    }
}
