use std::path::Path;

use anyhow::Result;
use chrono::Utc;

use lectura_lib::spaced::format_interval;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, file: &Path, format: &OutputFormat) -> Result<()> {
    let text = App::read_text(file)?;
    let key = app.study_key(&text)?;
    let now = Utc::now();
    let due = app.study_items.get_due(&key, now);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "due": due,
                "stats": app.study_items.stats(&key, now),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if due.is_empty() {
                println!("Nothing due.");
                return Ok(());
            }

            for item in &due {
                println!(
                    "{}  {:<6} {:<24} {}",
                    item.item_id,
                    format_interval(item.schedule.interval),
                    item.dimension,
                    item.content
                );
            }

            let stats = app.study_items.stats(&key, now);
            println!("\n{} due, {} active, {} total", stats.due, stats.active, stats.total);
        }
    }

    Ok(())
}
