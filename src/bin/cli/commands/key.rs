use std::path::Path;

use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, file: &Path, format: &OutputFormat) -> Result<()> {
    let text = App::read_text(file)?;
    let annotations = app.annotation_key(&text)?;
    let study_items = app.study_key(&text)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "annotations": annotations.as_str(),
                "studyItems": study_items.as_str(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("annotations  {}", annotations);
            println!("study items  {}", study_items);
        }
    }

    Ok(())
}
