use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use timeblock_core::{LearningDb, RescheduleReason, Task, ValidationError};

fn parse_reason(value: &str) -> Result<RescheduleReason, String> {
    RescheduleReason::parse(value).ok_or_else(|| {
        format!("unknown reason '{value}' (expected too-long, bad-time, interrupted or not-important)")
    })
}

#[derive(Subcommand)]
pub enum FeedbackAction {
    /// Record a finished task and how long it took
    Complete {
        #[arg(long)]
        list: String,
        #[arg(long)]
        title: String,
        /// Actual minutes spent
        #[arg(long)]
        minutes: u32,
        /// When the task was finished (RFC 3339); defaults to now
        #[arg(long, value_parser = super::parse_instant)]
        at: Option<DateTime<Utc>>,
        /// Task id; defaults to the title
        #[arg(long)]
        id: Option<String>,
    },
    /// Record that a scheduled block was moved
    Reschedule {
        #[arg(long)]
        list: String,
        #[arg(long)]
        title: String,
        #[arg(long, value_parser = parse_reason)]
        reason: RescheduleReason,
        /// Scheduled block start (RFC 3339)
        #[arg(long, value_parser = super::parse_instant)]
        start: DateTime<Utc>,
        /// Scheduled block end (RFC 3339)
        #[arg(long, value_parser = super::parse_instant)]
        end: DateTime<Utc>,
        /// Task id; defaults to the title
        #[arg(long)]
        id: Option<String>,
    },
}

pub fn run(action: FeedbackAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = LearningDb::open()?;
    let mut store = db.load_store()?;

    match action {
        FeedbackAction::Complete {
            list,
            title,
            minutes,
            at,
            id,
        } => {
            if minutes == 0 {
                return Err("--minutes must be at least 1".into());
            }
            let task = Task::new(id.unwrap_or_else(|| title.clone()), title, list);
            let completed_at = at.unwrap_or_else(Utc::now);
            store.record_completion(&task, Duration::minutes(minutes.into()), completed_at);
            db.save_store(&store)?;
            println!("recorded completion of '{}' ({minutes}m)", task.title);
        }
        FeedbackAction::Reschedule {
            list,
            title,
            reason,
            start,
            end,
            id,
        } => {
            if end <= start {
                return Err(ValidationError::InvalidTimeRange { start, end }.into());
            }
            let task = Task::new(id.unwrap_or_else(|| title.clone()), title, list);
            store.record_reschedule(&task, reason, start, end, Utc::now());
            db.save_store(&store)?;
            println!("recorded reschedule of '{}' ({})", task.title, reason.as_str());
        }
    }
    Ok(())
}
