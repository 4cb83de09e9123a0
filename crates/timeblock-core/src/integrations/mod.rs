//! Collaborator seams: where tasks and busy time come from.

mod snapshot;
mod traits;

pub use snapshot::{SnapshotProvider, SnapshotTask};
pub use traits::{CalendarProvider, ReminderProvider};
