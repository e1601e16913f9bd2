use std::path::Path;

use anyhow::Result;

use lectura_lib::annotations::{AnchorType, Annotation, AnnotationKind};

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, file: &Path, format: &OutputFormat) -> Result<()> {
    let text = App::read_text(file)?;
    let bundle = app.bridge(&text)?.bundle();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&bundle)?);
        }
        OutputFormat::Plain => {
            let total = bundle.highlights.len() + bundle.notes.len() + bundle.anchors.len();
            if total == 0 {
                println!("No annotations.");
                return Ok(());
            }

            for (paragraph, group) in &bundle.by_paragraph {
                println!("¶{}", paragraph);
                for annotation in group.highlights.iter().chain(&group.notes).chain(&group.anchors) {
                    println!("  {}", describe(annotation));
                }
            }

            let floating: Vec<&Annotation> = bundle
                .notes
                .iter()
                .filter(|n| n.paragraph_index().is_none())
                .collect();
            if !floating.is_empty() {
                println!("(no paragraph)");
                for note in floating {
                    println!("  {}", describe(note));
                }
            }

            println!(
                "\n{} highlight(s), {} note(s), {} anchor(s)",
                bundle.highlights.len(),
                bundle.notes.len(),
                bundle.anchors.len()
            );
        }
    }

    Ok(())
}

fn describe(annotation: &Annotation) -> String {
    match annotation.kind() {
        AnnotationKind::Highlight => format!("highlight  {}", annotation.id),
        AnnotationKind::Note => format!(
            "note       {}  {}",
            annotation.id,
            annotation.text().unwrap_or_default()
        ),
        AnnotationKind::Anchor => {
            let kind = annotation.anchor_type().map_or("anchor", AnchorType::as_str);
            format!("{:<10} {}", kind, annotation.id)
        }
    }
}
