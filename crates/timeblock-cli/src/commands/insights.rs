use chrono::Utc;
use timeblock_core::LearningDb;

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = LearningDb::open()?.load_store()?;
    let insights = store.generate_insights(Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&insights)?);
    } else if insights.is_empty() {
        println!("no insights yet");
    } else {
        for insight in &insights {
            println!("- {}", insight.message);
        }
    }
    Ok(())
}
