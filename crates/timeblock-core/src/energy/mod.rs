//! Energy-aware slot selection.
//!
//! Configured energy blocks label each free slot with the cognitive energy
//! it offers, and tasks are steered toward slots matching what they need.

mod matcher;

pub use matcher::{search_order, EnergyBlock, EnergyMatcher, SlotChoice};
