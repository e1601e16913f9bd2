use std::path::Path;

use anyhow::{Context, Result};

use lectura_lib::assessment::record_evaluation;

use crate::app::App;
use crate::commands::feedback::print_feedback;
use crate::OutputFormat;

pub fn run(
    app: &App,
    file: &Path,
    paragraph: usize,
    feedback_file: &Path,
    format: &OutputFormat,
) -> Result<()> {
    let text = App::read_text(file)?;
    let raw = App::read_json(feedback_file)?;
    let bridge = app.bridge(&text)?;

    let outcome = record_evaluation(&bridge, &app.study_items, paragraph, &raw)
        .context("Failed to record evaluation")?;
    app.annotations.flush(bridge.key());
    app.study_items.flush(&app.study_key(&text)?);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        OutputFormat::Plain => {
            print_feedback(&outcome.feedback, format)?;
            println!("\nAnchored on paragraph {} as {}", paragraph, outcome.anchor.id);
            if outcome.study_items_added.is_empty() {
                println!("No new study items.");
            } else {
                println!("{} new study item(s):", outcome.study_items_added.len());
                for item in &outcome.study_items_added {
                    println!("  {}  {}", item.item_id, item.content);
                }
            }
        }
    }

    Ok(())
}
