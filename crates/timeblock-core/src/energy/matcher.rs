//! Energy block lookup and energy-aware slot selection.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schedule::{parse_clock, EnergyLevel, SlotPreference, TimeSlot};

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// A time-of-day range tagged with an energy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyBlock {
    /// Seconds from midnight, inclusive
    pub start_secs: u32,
    /// Seconds from midnight, exclusive. May be less than `start_secs`
    /// for a block that runs past midnight.
    pub end_secs: u32,
    pub level: EnergyLevel,
}

impl EnergyBlock {
    pub fn new(start_secs: u32, end_secs: u32, level: EnergyLevel) -> Result<Self, ValidationError> {
        if start_secs >= SECONDS_PER_DAY || end_secs > SECONDS_PER_DAY || start_secs == end_secs {
            return Err(ValidationError::InvalidValue {
                field: "energy_block".into(),
                message: format!("invalid range {start_secs}..{end_secs}"),
            });
        }
        Ok(Self {
            start_secs,
            end_secs,
            level,
        })
    }

    /// Build from "HH:MM" clock strings.
    pub fn from_clock(start: &str, end: &str, level: EnergyLevel) -> Result<Self, ValidationError> {
        let start_secs = parse_clock(start)?.num_seconds_from_midnight();
        let end_secs = match parse_clock(end)?.num_seconds_from_midnight() {
            // "00:00" as an end means midnight at the end of the day
            0 => SECONDS_PER_DAY,
            secs => secs,
        };
        Self::new(start_secs, end_secs, level)
    }

    pub fn covers(&self, secs: u32) -> bool {
        if self.start_secs < self.end_secs {
            self.start_secs <= secs && secs < self.end_secs
        } else {
            secs >= self.start_secs || secs < self.end_secs
        }
    }
}

/// Where a block should go inside the slot list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotChoice {
    pub index: usize,
    pub start: DateTime<Utc>,
}

/// Fallback order of slot levels for each required level.
pub fn search_order(required: EnergyLevel) -> [EnergyLevel; 3] {
    match required {
        EnergyLevel::HighFocus => [EnergyLevel::HighFocus, EnergyLevel::Medium, EnergyLevel::Low],
        EnergyLevel::Medium => [EnergyLevel::Medium, EnergyLevel::HighFocus, EnergyLevel::Low],
        EnergyLevel::Low => [EnergyLevel::Low, EnergyLevel::Medium, EnergyLevel::HighFocus],
    }
}

/// Labels slots and picks slots for tasks based on configured energy blocks.
#[derive(Debug, Clone, Default)]
pub struct EnergyMatcher {
    blocks: Vec<EnergyBlock>,
}

impl EnergyMatcher {
    pub fn new(blocks: Vec<EnergyBlock>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[EnergyBlock] {
        &self.blocks
    }

    /// Level of the first block covering `instant`, Medium when none does.
    pub fn energy_level_at(&self, instant: DateTime<Utc>) -> EnergyLevel {
        let secs = instant.num_seconds_from_midnight();
        self.blocks
            .iter()
            .find(|b| b.covers(secs))
            .map(|b| b.level)
            .unwrap_or(EnergyLevel::Medium)
    }

    /// Label each slot with the level at its midpoint.
    pub fn annotate_slots(&self, slots: &[TimeSlot]) -> Vec<TimeSlot> {
        slots
            .iter()
            .map(|slot| TimeSlot {
                energy: Some(self.energy_level_at(slot.midpoint())),
                ..*slot
            })
            .collect()
    }

    /// Pick a slot for a block of `duration` needing `required` energy.
    ///
    /// Levels are tried in [`search_order`]; the first level with at least
    /// one long-enough slot wins, and `preference` picks among its slots.
    pub fn find_best_energy_match(
        &self,
        required: EnergyLevel,
        slots: &[TimeSlot],
        duration: Duration,
        preference: SlotPreference,
    ) -> Option<SlotChoice> {
        for level in search_order(required) {
            let matches: Vec<usize> = slots
                .iter()
                .enumerate()
                .filter(|(_, s)| s.energy.unwrap_or_default() == level && s.can_fit(duration))
                .map(|(i, _)| i)
                .collect();

            if matches.is_empty() {
                continue;
            }

            let choice = match preference {
                SlotPreference::MorningFirst => {
                    let index = matches[0];
                    SlotChoice {
                        index,
                        start: slots[index].start,
                    }
                }
                SlotPreference::AfternoonFirst => {
                    let index = matches[matches.len() - 1];
                    SlotChoice {
                        index,
                        start: slots[index].end - duration,
                    }
                }
                SlotPreference::SpreadEvenly => {
                    let index = matches[matches.len() / 2];
                    SlotChoice {
                        index,
                        start: slots[index].start,
                    }
                }
            };
            return Some(choice);
        }
        None
    }
}
