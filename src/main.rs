//! # cardgrid CLI
//!
//! Usage:
//!   cardgrid generate words.csv flashcards.pdf
//!   cardgrid generate words.csv flashcards.pdf --font fonts/NotoSans.ttf -v
//!   cardgrid generate words.csv flashcards.pdf --config cards.json

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cardgrid::{CardgridError, GeneratorConfig};

#[derive(Parser)]
#[command(name = "cardgrid", about = "Printable flashcard sheets from a vocabulary table", version)]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a CSV of terms into a PDF of 3×3 flashcards
    Generate {
        /// Vocabulary table (CSV, semicolon or tab separated)
        input: PathBuf,
        /// Where to write the PDF
        output: PathBuf,
        /// JSON file overriding layout, image or font settings
        #[arg(long)]
        config: Option<PathBuf>,
        /// TrueType font for card text
        #[arg(long)]
        font: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Generate {
            input,
            output,
            config,
            font,
        } => {
            if let Err(e) = run_generate(&input, &output, config, font) {
                eprintln!("✗ {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_generate(
    input: &std::path::Path,
    output: &std::path::Path,
    config_path: Option<PathBuf>,
    font: Option<PathBuf>,
) -> Result<(), CardgridError> {
    let mut config = match config_path {
        Some(path) => GeneratorConfig::from_json_file(&path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(font) = font {
        config.font.path = font;
    }

    let summary = cardgrid::generate(input, output, &config)?;
    println!(
        "Saved {} ({} cards, {} pages)",
        output.display(),
        summary.cards,
        summary.pages
    );
    Ok(())
}
