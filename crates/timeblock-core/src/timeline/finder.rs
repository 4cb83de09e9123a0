//! Interval arithmetic over busy and free time.
//!
//! Free slots are found by subtracting merged busy intervals from a window,
//! then shrinking the edges that sit next to a commitment by a buffer.
//! After a block is placed, [`consume`] removes the used time (plus the
//! buffer on both sides) from the slot it came from.

use chrono::{DateTime, Duration, Utc};

use crate::schedule::{BusyInterval, TimeSlot};

/// Merge overlapping or touching busy intervals.
///
/// The result is sorted by start and pairwise disjoint with a gap between
/// neighbours. Zero-length or inverted inputs are dropped. Idempotent.
pub fn merge_overlapping(intervals: &[BusyInterval]) -> Vec<BusyInterval> {
    let mut sorted: Vec<BusyInterval> = intervals
        .iter()
        .filter(|i| i.start < i.end)
        .copied()
        .collect();
    sorted.sort_by_key(|i| (i.start, i.end));

    let mut merged: Vec<BusyInterval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some(current) if interval.start <= current.end => {
                if interval.end > current.end {
                    current.end = interval.end;
                }
                current.all_day &= interval.all_day;
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Free slots strictly inside `window` that no busy interval covers.
///
/// Busy intervals are merged first, so callers may pass raw calendar data.
pub fn subtract(window: TimeSlot, busy: &[BusyInterval]) -> Vec<TimeSlot> {
    let mut slots = Vec::new();
    let mut cursor = window.start;

    for interval in merge_overlapping(busy) {
        // Skip intervals that end before our current position
        if interval.end <= cursor {
            continue;
        }
        if interval.start >= window.end {
            break;
        }

        if interval.start > cursor {
            if let Some(slot) = TimeSlot::new(cursor, interval.start.min(window.end)) {
                slots.push(slot);
            }
        }
        cursor = cursor.max(interval.end);
        if cursor >= window.end {
            break;
        }
    }

    if let Some(slot) = TimeSlot::new(cursor, window.end) {
        slots.push(slot);
    }
    slots
}

fn touches(busy: &[BusyInterval], instant: DateTime<Utc>) -> bool {
    busy.iter().any(|b| b.start <= instant && instant <= b.end)
}

/// Shrink slot edges that touch a busy interval by `buffer`.
///
/// Window edges are left alone. A slot that collapses is dropped.
pub fn apply_buffer(slots: &[TimeSlot], busy: &[BusyInterval], buffer: Duration) -> Vec<TimeSlot> {
    if buffer <= Duration::zero() {
        return slots.to_vec();
    }

    slots
        .iter()
        .filter_map(|slot| {
            let start = if touches(busy, slot.start) {
                slot.start + buffer
            } else {
                slot.start
            };
            let end = if touches(busy, slot.end) {
                slot.end - buffer
            } else {
                slot.end
            };
            TimeSlot::new(start, end).map(|s| TimeSlot {
                energy: slot.energy,
                ..s
            })
        })
        .collect()
}

/// Drop slots shorter than `min`.
pub fn filter_min_duration(slots: Vec<TimeSlot>, min: Duration) -> Vec<TimeSlot> {
    slots.into_iter().filter(|s| s.can_fit(min)).collect()
}

/// Replace the slot at `index` with what remains after `[used_start, used_end)`
/// plus `buffer` on each side is taken out of it.
///
/// Produces zero, one or two fragments in place of the consumed slot; every
/// other slot passes through unchanged. An out-of-range index is a no-op.
pub fn consume(
    slots: &[TimeSlot],
    index: usize,
    used_start: DateTime<Utc>,
    used_end: DateTime<Utc>,
    buffer: Duration,
) -> Vec<TimeSlot> {
    let mut out = Vec::with_capacity(slots.len() + 1);
    for (i, slot) in slots.iter().enumerate() {
        if i != index {
            out.push(*slot);
            continue;
        }
        let before = TimeSlot::new(slot.start, used_start - buffer);
        let after = TimeSlot::new(used_end + buffer, slot.end);
        for fragment in [before, after].into_iter().flatten() {
            out.push(TimeSlot {
                energy: slot.energy,
                ..fragment
            });
        }
    }
    out
}

/// Produces buffered, size-filtered free slots for a window.
#[derive(Debug, Clone)]
pub struct SlotFinder {
    buffer: Duration,
    min_slot: Duration,
}

impl SlotFinder {
    /// Create a finder with a 10 minute buffer and 15 minute minimum slot
    pub fn new() -> Self {
        Self {
            buffer: Duration::minutes(10),
            min_slot: Duration::minutes(15),
        }
    }

    pub fn with_buffer(mut self, buffer: Duration) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_min_slot(mut self, min_slot: Duration) -> Self {
        self.min_slot = min_slot;
        self
    }

    /// Merge, subtract, buffer and filter in one pass.
    pub fn free_slots(&self, window: TimeSlot, busy: &[BusyInterval]) -> Vec<TimeSlot> {
        let merged = merge_overlapping(busy);
        let free = subtract(window, &merged);
        let buffered = apply_buffer(&free, &merged, self.buffer);
        filter_min_duration(buffered, self.min_slot)
    }
}

impl Default for SlotFinder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn busy(h1: u32, m1: u32, h2: u32, m2: u32) -> BusyInterval {
        BusyInterval::new(at(h1, m1), at(h2, m2))
    }

    fn window(h1: u32, h2: u32) -> TimeSlot {
        TimeSlot::new(at(h1, 0), at(h2, 0)).unwrap()
    }

    fn spans(slots: &[TimeSlot]) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        slots.iter().map(|s| (s.start, s.end)).collect()
    }

    #[test]
    fn merge_joins_touching_and_overlapping() {
        let merged = merge_overlapping(&[
            busy(13, 0, 14, 0),
            busy(9, 0, 10, 0),
            busy(10, 0, 11, 0),
            busy(13, 30, 13, 45),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].start, merged[0].end), (at(9, 0), at(11, 0)));
        assert_eq!((merged[1].start, merged[1].end), (at(13, 0), at(14, 0)));
    }

    #[test]
    fn merge_is_idempotent() {
        let once = merge_overlapping(&[busy(9, 0, 10, 0), busy(9, 30, 12, 0), busy(15, 0, 16, 0)]);
        assert_eq!(merge_overlapping(&once), once);
    }

    #[test]
    fn subtract_clips_at_window_edges() {
        let free = subtract(window(9, 17), &[busy(8, 0, 9, 30), busy(16, 30, 18, 0)]);
        assert_eq!(spans(&free), vec![(at(9, 30), at(16, 30))]);
    }

    #[test]
    fn subtract_with_no_busy_returns_window() {
        let free = subtract(window(9, 17), &[]);
        assert_eq!(spans(&free), vec![(at(9, 0), at(17, 0))]);
    }

    #[test]
    fn subtract_fully_busy_window_is_empty() {
        assert!(subtract(window(9, 17), &[busy(8, 0, 18, 0)]).is_empty());
    }

    #[test]
    fn lunch_with_ten_minute_buffer() {
        let finder = SlotFinder::new().with_buffer(Duration::minutes(10));
        let free = finder.free_slots(window(9, 17), &[busy(12, 0, 13, 0)]);
        assert_eq!(
            spans(&free),
            vec![(at(9, 0), at(11, 50)), (at(13, 10), at(17, 0))]
        );
    }

    #[test]
    fn buffer_collapses_short_gap() {
        // 15 minute gap between meetings cannot hold two 10 minute buffers.
        let merged = [busy(10, 0, 11, 0), busy(11, 15, 12, 0)];
        let free = subtract(window(10, 12), &merged);
        assert_eq!(free.len(), 1);
        assert!(apply_buffer(&free, &merged, Duration::minutes(10)).is_empty());
    }

    #[test]
    fn min_duration_filter_drops_fragments() {
        let finder = SlotFinder::new()
            .with_buffer(Duration::zero())
            .with_min_slot(Duration::minutes(30));
        let free = finder.free_slots(window(9, 12), &[busy(9, 20, 11, 0)]);
        assert_eq!(spans(&free), vec![(at(11, 0), at(12, 0))]);
    }

    #[test]
    fn consume_splits_slot_in_two() {
        let slots = vec![window(9, 12), window(13, 17)];
        let out = consume(&slots, 0, at(10, 0), at(10, 30), Duration::minutes(15));
        assert_eq!(
            spans(&out),
            vec![
                (at(9, 0), at(9, 45)),
                (at(10, 45), at(12, 0)),
                (at(13, 0), at(17, 0)),
            ]
        );
    }

    #[test]
    fn consume_at_slot_start_leaves_one_fragment() {
        let slots = vec![window(9, 12)];
        let out = consume(&slots, 0, at(9, 0), at(10, 0), Duration::minutes(10));
        assert_eq!(spans(&out), vec![(at(10, 10), at(12, 0))]);
    }

    #[test]
    fn consume_whole_slot_removes_it() {
        let slots = vec![window(9, 10), window(11, 12)];
        let out = consume(&slots, 0, at(9, 0), at(10, 0), Duration::minutes(5));
        assert_eq!(spans(&out), vec![(at(11, 0), at(12, 0))]);
    }

    #[test]
    fn consume_out_of_range_is_noop() {
        let slots = vec![window(9, 10)];
        assert_eq!(consume(&slots, 3, at(9, 0), at(9, 30), Duration::zero()), slots);
    }
}
