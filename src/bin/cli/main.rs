mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lectura-cli", about = "Annotate texts, normalize feedback and review study items", version)]
struct Cli {
    /// Config file (default: ~/.config/lectura/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Print the annotation and study-item keys of a text
    Key {
        /// Text file
        file: PathBuf,
    },

    /// Print every annotation of a text
    Annotations {
        /// Text file
        file: PathBuf,
    },

    /// Toggle the highlight on a paragraph
    Highlight {
        /// Text file
        file: PathBuf,
        /// Zero-based paragraph index
        paragraph: usize,
    },

    /// Normalize a raw feedback payload
    Normalize {
        /// Feedback JSON file
        feedback: PathBuf,
    },

    /// Merge several feedback payloads into one record
    Merge {
        /// Feedback JSON files, later ones win
        #[arg(required = true)]
        feedback: Vec<PathBuf>,
    },

    /// Anchor a feedback payload on a paragraph and derive study items
    Evaluate {
        /// Text file
        file: PathBuf,
        /// Zero-based paragraph index
        paragraph: usize,
        /// Feedback JSON file
        feedback: PathBuf,
    },

    /// List study items due now
    Due {
        /// Text file
        file: PathBuf,
    },

    /// Grade a study item
    Review {
        /// Text file
        file: PathBuf,
        /// Study item id
        item_id: String,
        /// Recall quality, 0-5
        quality: f64,
    },

    /// Show the rubric, or one dimension of it
    Rubric {
        /// Dimension key or name
        dimension: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Key { file } => {
            let app = app::App::new(cli.config.as_deref())?;
            commands::key::run(&app, &file, &cli.format)?;
        }
        Command::Annotations { file } => {
            let app = app::App::new(cli.config.as_deref())?;
            commands::annotations::run(&app, &file, &cli.format)?;
        }
        Command::Highlight { file, paragraph } => {
            let app = app::App::new(cli.config.as_deref())?;
            commands::highlight::run(&app, &file, paragraph, &cli.format)?;
        }
        Command::Normalize { feedback } => {
            commands::feedback::run_normalize(&feedback, &cli.format)?;
        }
        Command::Merge { feedback } => {
            commands::feedback::run_merge(&feedback, &cli.format)?;
        }
        Command::Evaluate { file, paragraph, feedback } => {
            let app = app::App::new(cli.config.as_deref())?;
            commands::evaluate::run(&app, &file, paragraph, &feedback, &cli.format)?;
        }
        Command::Due { file } => {
            let app = app::App::new(cli.config.as_deref())?;
            commands::due::run(&app, &file, &cli.format)?;
        }
        Command::Review { file, item_id, quality } => {
            let app = app::App::new(cli.config.as_deref())?;
            commands::review::run(&app, &file, &item_id, quality, &cli.format)?;
        }
        Command::Rubric { dimension } => {
            commands::rubric::run(dimension.as_deref(), &cli.format)?;
        }
    }

    Ok(())
}
