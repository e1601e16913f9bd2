use std::path::Path;

use anyhow::{Context, Result};

use lectura_lib::spaced::format_interval;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, file: &Path, item_id: &str, quality: f64, format: &OutputFormat) -> Result<()> {
    let text = App::read_text(file)?;
    let key = app.study_key(&text)?;

    let item = app
        .study_items
        .update_item(&key, item_id, quality)
        .context("Invalid review")?
        .with_context(|| format!("Study item '{}' not found", item_id))?;
    app.study_items.flush(&key);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        OutputFormat::Plain => {
            println!(
                "Next review in {} ({})",
                format_interval(item.schedule.interval),
                item.due_date.format("%Y-%m-%d")
            );
            println!(
                "Ease {:.2}, {} review(s), average quality {:.1}",
                item.schedule.ef, item.review_count, item.average_quality
            );
        }
    }

    Ok(())
}
