//! Greedy time-block scheduler.
//!
//! Takes the open tasks, the planning window with its busy intervals, and
//! the learning store, and places the most urgent tasks into free time:
//! - Expands the horizon into working-hour windows and finds buffered free slots
//! - Orders tasks by urgency and keeps the top `max_suggestions`
//! - Sizes, splits and buffers each task from learned history
//! - Picks a slot per block by learned time of day, then energy, then preference
//!
//! Placement is strictly sequential: each block consumes its slot (plus
//! buffer) before the next block is considered.

mod window;

use chrono::{DateTime, Duration, Utc};

use crate::energy::{EnergyMatcher, SlotChoice};
use crate::learning::LearningStore;
use crate::schedule::{
    BusyInterval, ScheduledBlock, SchedulePlan, SlotPreference, Task, TimeSlot, UnscheduledTask,
};
use crate::timeline::{consume, filter_min_duration, SlotFinder, TaskPrioritizer};

pub use window::{working_windows, ScheduleWindow, SchedulingSettings, MAX_HORIZON_DAYS};

/// Computes schedule plans against a learning store at a fixed `now`.
pub struct SchedulingEngine<'a> {
    learning: &'a LearningStore,
    now: DateTime<Utc>,
}

impl<'a> SchedulingEngine<'a> {
    pub fn new(learning: &'a LearningStore, now: DateTime<Utc>) -> Self {
        Self { learning, now }
    }

    /// Place the top tasks into free time inside `window`.
    ///
    /// Tasks that do not fit are listed in [`SchedulePlan::unscheduled`];
    /// running out of room is not an error.
    pub fn compute_schedule(
        &self,
        tasks: &[Task],
        window: &ScheduleWindow,
        settings: &SchedulingSettings,
    ) -> SchedulePlan {
        let busy: Vec<BusyInterval> = window
            .busy
            .iter()
            .filter(|b| settings.all_day_events_block || !b.all_day)
            .copied()
            .collect();

        let finder = SlotFinder::new()
            .with_buffer(settings.base_buffer)
            .with_min_slot(settings.min_slot);
        let free: Vec<TimeSlot> = working_windows(window, settings)
            .into_iter()
            .flat_map(|w| finder.free_slots(w, &busy))
            .collect();

        let matcher = EnergyMatcher::new(settings.energy_blocks.clone());
        let mut slots = matcher.annotate_slots(&free);
        tracing::debug!(slots = slots.len(), busy = busy.len(), "free slots found");

        let prioritizer = TaskPrioritizer::new(self.now).with_learning(self.learning);
        let mut plan = SchedulePlan::default();
        for scored in prioritizer
            .prioritize(tasks)
            .into_iter()
            .take(settings.max_suggestions)
        {
            slots = self.place_task(&scored.task, slots, settings, &matcher, &mut plan);
        }

        tracing::info!(
            placed = plan.blocks.len(),
            unscheduled = plan.unscheduled.len(),
            "schedule computed"
        );
        plan
    }

    /// Block lengths for `task`: one block, or two when history says split.
    fn block_lengths(&self, task: &Task, settings: &SchedulingSettings) -> Vec<Duration> {
        let base = task.duration_hint().unwrap_or(settings.default_duration);
        let duration = self.learning.adjusted_duration(task, base, self.now);
        if !self.learning.should_split(task, duration, self.now) {
            return vec![duration];
        }
        let total = duration.num_minutes();
        let first = total / 2;
        tracing::debug!(task_id = %task.id, total, "splitting task into two blocks");
        vec![Duration::minutes(first), Duration::minutes(total - first)]
    }

    fn place_task(
        &self,
        task: &Task,
        mut slots: Vec<TimeSlot>,
        settings: &SchedulingSettings,
        matcher: &EnergyMatcher,
        plan: &mut SchedulePlan,
    ) -> Vec<TimeSlot> {
        let lengths = self.block_lengths(task, settings);
        let buffer = settings.base_buffer + self.learning.buffer_recommendation(task, self.now);
        let total = lengths.len() as u32;
        let mut missing = 0;

        for (i, length) in lengths.into_iter().enumerate() {
            slots = discard_degenerate(slots);
            let Some(choice) = self.select_slot(task, &slots, length, settings, matcher) else {
                tracing::debug!(task_id = %task.id, block = i + 1, "no slot fits block");
                missing += 1;
                continue;
            };

            let start = choice.start;
            let end = start + length;
            let block = ScheduledBlock {
                task_id: task.id.clone(),
                title: task.title.clone(),
                start,
                end,
                duration: length.num_minutes(),
                block_index: (total > 1).then_some(i as u32 + 1),
                total_blocks: (total > 1).then_some(total),
            };

            let clash = plan.blocks.iter().any(|b| b.overlaps(&block));
            debug_assert!(!clash, "block for {} overlaps an earlier block", task.id);
            if clash {
                tracing::warn!(task_id = %task.id, %start, "discarding overlapping block");
                missing += 1;
                continue;
            }

            tracing::debug!(task_id = %task.id, %start, %end, "placed block");
            plan.blocks.push(block);
            // fragments take the level at their own midpoint
            slots = matcher.annotate_slots(&filter_min_duration(
                consume(&slots, choice.index, start, end, buffer),
                settings.min_slot,
            ));
        }

        if missing > 0 {
            plan.unscheduled.push(UnscheduledTask {
                task_id: task.id.clone(),
                title: task.title.clone(),
                missing_blocks: missing,
                total_blocks: total,
            });
        }
        slots
    }

    /// Learned time of day first, then energy match, then plain preference.
    fn select_slot(
        &self,
        task: &Task,
        slots: &[TimeSlot],
        length: Duration,
        settings: &SchedulingSettings,
        matcher: &EnergyMatcher,
    ) -> Option<SlotChoice> {
        let preference = settings.slot_preference;
        let anchor = |slot: &TimeSlot| match preference {
            SlotPreference::AfternoonFirst => slot.end - length,
            _ => slot.start,
        };
        let candidates: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.can_fit(length))
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let scored: Vec<(usize, f64)> = candidates
            .iter()
            .map(|&i| (i, self.learning.time_of_day_score(task, anchor(&slots[i]))))
            .collect();
        let best = scored.iter().map(|(_, s)| *s).fold(f64::MIN, f64::max);
        if best > 0.0 {
            let mut top = scored.iter().filter(|(_, s)| *s == best).map(|(i, _)| *i);
            let index = match preference {
                SlotPreference::AfternoonFirst => top.last(),
                _ => top.next(),
            }?;
            tracing::debug!(task_id = %task.id, score = best, "using learned time of day");
            return Some(SlotChoice {
                index,
                start: anchor(&slots[index]),
            });
        }

        if settings.energy_aware && !matcher.is_empty() {
            return matcher.find_best_energy_match(task.energy_requirement, slots, length, preference);
        }

        let index = match preference {
            SlotPreference::AfternoonFirst => candidates.last(),
            SlotPreference::MorningFirst | SlotPreference::SpreadEvenly => candidates.first(),
        }
        .copied()?;
        Some(SlotChoice {
            index,
            start: anchor(&slots[index]),
        })
    }
}

/// Drop slots whose start is not before their end.
fn discard_degenerate(slots: Vec<TimeSlot>) -> Vec<TimeSlot> {
    slots
        .into_iter()
        .filter(|s| {
            let ok = s.start < s.end;
            debug_assert!(ok, "degenerate slot {}..{}", s.start, s.end);
            if !ok {
                tracing::warn!(start = %s.start, end = %s.end, "discarding degenerate slot");
            }
            ok
        })
        .collect()
}
