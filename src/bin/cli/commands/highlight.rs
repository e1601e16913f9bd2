use std::path::Path;

use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, file: &Path, paragraph: usize, format: &OutputFormat) -> Result<()> {
    let text = App::read_text(file)?;
    let key = app.annotation_key(&text)?;

    let outcome = app.annotations.toggle_highlight(&key, paragraph, Some("cli"));
    app.annotations.flush(&key);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "paragraph": paragraph,
                "active": outcome.active,
                "added": outcome.added,
                "removed": outcome.removed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if outcome.active {
                println!("Highlighted paragraph {}", paragraph);
            } else {
                println!("Removed highlight from paragraph {}", paragraph);
            }
        }
    }

    Ok(())
}
