//! Planning horizon and the settings a run is computed with.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};

use crate::energy::EnergyBlock;
use crate::error::ValidationError;
use crate::schedule::{BusyInterval, EnergyLevel, SlotPreference, TimeSlot};

/// Longest planning horizon, in days.
pub const MAX_HORIZON_DAYS: i64 = 366;

/// Everything the engine reads from user configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingSettings {
    /// Most tasks placed per run
    pub max_suggestions: usize,
    /// Gap kept around busy intervals and placed blocks
    pub base_buffer: Duration,
    /// Smallest slot worth keeping
    pub min_slot: Duration,
    /// Block length for tasks without a duration hint
    pub default_duration: Duration,
    pub slot_preference: SlotPreference,
    pub energy_aware: bool,
    /// Treat all-day calendar entries as busy
    pub all_day_events_block: bool,
    pub working_start: NaiveTime,
    pub working_end: NaiveTime,
    pub working_days: Vec<Weekday>,
    pub energy_blocks: Vec<EnergyBlock>,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        let clock = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN);
        let block = |start: u32, end: u32, level| EnergyBlock {
            start_secs: start * 3600,
            end_secs: end * 3600,
            level,
        };
        Self {
            max_suggestions: 5,
            base_buffer: Duration::minutes(10),
            min_slot: Duration::minutes(15),
            default_duration: Duration::minutes(30),
            slot_preference: SlotPreference::MorningFirst,
            energy_aware: true,
            all_day_events_block: false,
            working_start: clock(9),
            working_end: clock(17),
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            energy_blocks: vec![
                block(9, 12, EnergyLevel::HighFocus),
                block(12, 14, EnergyLevel::Low),
                block(14, 17, EnergyLevel::Medium),
            ],
        }
    }
}

impl SchedulingSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |field: &str, message: &str| ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.to_string(),
        };
        if self.base_buffer < Duration::zero() {
            return Err(invalid("base_buffer_minutes", "must not be negative"));
        }
        if self.min_slot <= Duration::zero() {
            return Err(invalid("min_slot_minutes", "must be positive"));
        }
        if self.default_duration <= Duration::zero() {
            return Err(invalid("default_duration_minutes", "must be positive"));
        }
        if self.working_start >= self.working_end {
            return Err(invalid("working_hours", "start must be before end"));
        }
        Ok(())
    }
}

/// The range one run plans over, with everything already booked in it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub busy: Vec<BusyInterval>,
}

impl ScheduleWindow {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        busy: Vec<BusyInterval>,
    ) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end, busy })
    }

    /// Window covering `days` days from `start`, at most [`MAX_HORIZON_DAYS`].
    pub fn days_from(
        start: DateTime<Utc>,
        days: i64,
        busy: Vec<BusyInterval>,
    ) -> Result<Self, ValidationError> {
        if !(1..=MAX_HORIZON_DAYS).contains(&days) {
            return Err(ValidationError::InvalidValue {
                field: "days".to_string(),
                message: format!("must be between 1 and {MAX_HORIZON_DAYS}, got {days}"),
            });
        }
        let end = Duration::try_days(days)
            .and_then(|span| start.checked_add_signed(span))
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "days".to_string(),
                message: format!("{days} days from {start} is out of range"),
            })?;
        Self::new(start, end, busy)
    }
}

/// Working hours of each working day in the window, clipped to it.
pub fn working_windows(window: &ScheduleWindow, settings: &SchedulingSettings) -> Vec<TimeSlot> {
    let mut out = Vec::new();
    let last = window.end.date_naive();
    let mut day = window.start.date_naive();
    while day <= last {
        if settings.working_days.contains(&day.weekday()) {
            let start = day.and_time(settings.working_start).and_utc().max(window.start);
            let end = day.and_time(settings.working_end).and_utc().min(window.end);
            if let Some(slot) = TimeSlot::new(start, end) {
                out.push(slot);
            }
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, h, m, 0).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        let settings = SchedulingSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.energy_blocks.len(), 3);
    }

    #[test]
    fn validation_rejects_inverted_hours() {
        let settings = SchedulingSettings {
            working_start: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            ..SchedulingSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn window_requires_order() {
        assert!(ScheduleWindow::new(at(2, 9, 0), at(2, 9, 0), vec![]).is_err());
    }

    #[test]
    fn windows_skip_weekends_and_clip() {
        // Friday 2026-03-06 10:30 through Tuesday 2026-03-10 12:00
        let window = ScheduleWindow::new(at(6, 10, 30), at(10, 12, 0), vec![]).unwrap();
        let days = working_windows(&window, &SchedulingSettings::default());
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].start, at(6, 10, 30));
        assert_eq!(days[0].end, at(6, 17, 0));
        assert_eq!(days[1].start, at(9, 9, 0));
        assert_eq!(days[2].end, at(10, 12, 0));
    }

    #[test]
    fn days_from_rejects_out_of_range_horizons() {
        let start = at(2, 8, 0);
        let week = ScheduleWindow::days_from(start, 7, vec![]).unwrap();
        assert_eq!(week.end, at(9, 8, 0));

        for days in [0, -1, MAX_HORIZON_DAYS + 1, 200_000_000, i64::MAX] {
            assert!(matches!(
                ScheduleWindow::days_from(start, days, vec![]),
                Err(ValidationError::InvalidValue { .. })
            ));
        }
        assert!(matches!(
            ScheduleWindow::days_from(DateTime::<Utc>::MAX_UTC, 1, vec![]),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn window_after_hours_is_empty() {
        let window = ScheduleWindow::new(at(2, 18, 0), at(2, 23, 0), vec![]).unwrap();
        assert!(working_windows(&window, &SchedulingSettings::default()).is_empty());
    }
}
