use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;
use timeblock_core::{
    CalendarProvider, Config, LearningDb, ReminderProvider, SchedulePlan, ScheduleWindow,
    SchedulingEngine, SnapshotProvider,
};

#[derive(Args)]
pub struct PlanArgs {
    /// Snapshot JSON holding `tasks` and `busy`
    #[arg(long)]
    pub input: PathBuf,
    /// Days to plan; defaults to scheduling.horizon_days
    #[arg(long)]
    pub days: Option<u32>,
    /// Plan from this instant instead of now (RFC 3339)
    #[arg(long, value_parser = super::parse_instant)]
    pub now: Option<DateTime<Utc>>,
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let settings = config.scheduling_settings()?;
    let days = args.days.unwrap_or(config.scheduling.horizon_days);

    let now = args.now.unwrap_or_else(Utc::now);
    let mut window = ScheduleWindow::days_from(now, days.into(), Vec::new())?;
    let snapshot = SnapshotProvider::load(&args.input)?;
    window.busy = snapshot.busy_intervals(window.start, window.end)?;
    let tasks = snapshot.open_tasks()?;

    let store = LearningDb::open()?.load_store()?;
    let plan = SchedulingEngine::new(&store, now).compute_schedule(&tasks, &window, &settings);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn print_plan(plan: &SchedulePlan) {
    if plan.is_empty() {
        println!("no blocks scheduled");
    }
    for block in &plan.blocks {
        let part = match (block.block_index, block.total_blocks) {
            (Some(i), Some(n)) => format!(" ({i}/{n})"),
            _ => String::new(),
        };
        println!(
            "{}  {}-{}  {:>4}m  {}{}",
            block.start.format("%a %Y-%m-%d"),
            block.start.format("%H:%M"),
            block.end.format("%H:%M"),
            block.duration,
            block.title,
            part
        );
    }
    for task in &plan.unscheduled {
        println!(
            "unscheduled: {} ({} of {} blocks did not fit)",
            task.title, task.missing_blocks, task.total_blocks
        );
    }
}
