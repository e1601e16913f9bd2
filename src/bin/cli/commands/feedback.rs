use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use lectura_lib::feedback::{merge_feedback, normalize_feedback_input, CanonicalFeedback};
use lectura_lib::rubric::CriticalLiteracyRubric;

use crate::app::App;
use crate::OutputFormat;

pub fn run_normalize(file: &Path, format: &OutputFormat) -> Result<()> {
    let raw = App::read_json(file)?;
    let feedback = normalize_feedback_input(&raw, &CriticalLiteracyRubric::new());
    print_feedback(&feedback, format)
}

pub fn run_merge(files: &[PathBuf], format: &OutputFormat) -> Result<()> {
    let raws = files
        .iter()
        .map(|f| App::read_json(f))
        .collect::<Result<Vec<_>>>()?;

    match merge_feedback(&raws, &CriticalLiteracyRubric::new()) {
        Some(feedback) => print_feedback(&feedback, format),
        None => bail!("Nothing to merge"),
    }
}

pub fn print_feedback(feedback: &CanonicalFeedback, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(feedback)?);
        }
        OutputFormat::Plain => {
            let score = feedback
                .score10
                .map(|s| format!("{}/10", s))
                .unwrap_or_else(|| "unscored".to_string());
            println!("{}  {}", feedback.dimension, score);
            if let (Some(level), Some(descriptor)) = (feedback.level4, &feedback.level_descriptor) {
                println!("Level {}: {}", level, descriptor);
            }
            if !feedback.summary.is_empty() {
                println!("\n{}", feedback.summary);
            }

            if !feedback.strengths.is_empty() {
                println!("\nStrengths");
                for s in &feedback.strengths {
                    println!("  + [{}] {}", s.criterion, s.text);
                }
            }
            if !feedback.improvements.is_empty() {
                println!("\nImprovements");
                for i in &feedback.improvements {
                    println!("  - [{}] {}", i.criterion, i.action);
                }
            }
            if !feedback.probing_questions.is_empty() {
                println!("\nQuestions");
                for q in &feedback.probing_questions {
                    println!("  ? {}", q.question);
                }
            }
            if !feedback.evidence.is_empty() {
                println!("\nEvidence");
                for e in &feedback.evidence {
                    match e.paragraph {
                        Some(p) => println!("  \"{}\" (¶{})", e.quote, p),
                        None => println!("  \"{}\"", e.quote),
                    }
                }
            }
        }
    }

    Ok(())
}
