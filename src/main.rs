use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use nasal_insight_lib::config::{self, AnalyzerConfig};
use nasal_insight_lib::pipeline::diagnosis::{
    load_image, normalize_outcome, render_text, GeminiClient, NasalImageAnalyzer, DIAGNOSIS_PROMPT,
};

#[derive(Parser)]
#[command(name = "nasal-insight", version, about = "AI nasal secretion photo analysis")]
struct Cli {
    /// Print JSON instead of the labelled text report
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a photo to the configured model and print the normalized diagnosis
    Analyze {
        /// JPG or PNG image
        image: PathBuf,
    },
    /// Normalize a saved model answer (reads stdin when no file is given)
    Normalize { file: Option<PathBuf> },
    /// Print the instruction prompt sent with every image
    Prompt,
}

fn main() -> ExitCode {
    nasal_insight_lib::init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Analyze { image } => {
            let config = AnalyzerConfig::from_env().map_err(|e| e.to_string())?;
            tracing::info!(model = %config.model, "{} v{}", config::APP_NAME, config::APP_VERSION);

            let client = GeminiClient::from_config(&config).map_err(|e| e.to_string())?;
            let analyzer = NasalImageAnalyzer::new(Arc::new(client));

            let encoded = load_image(&image).map_err(|e| {
                tracing::error!(error = %e, path = %image.display(), "Could not load image");
                e.user_message().to_string()
            })?;
            let report = analyzer.analyze_encoded(&encoded).map_err(|e| {
                tracing::error!(error = %e, "Analysis failed");
                e.user_message().to_string()
            })?;

            if cli.json {
                print_json(&report)?;
            } else {
                println!("{}", render_text(&report.record));
            }
        }
        Command::Normalize { file } => {
            let raw = read_answer(file.as_deref(), std::io::stdin())?;

            let outcome = normalize_outcome(&raw);
            if cli.json {
                print_json(&outcome)?;
            } else {
                println!("{}", render_text(outcome.record()));
            }
        }
        Command::Prompt => println!("{}", DIAGNOSIS_PROMPT.trim()),
    }
    Ok(())
}

/// Model answer from `file`, or from `stdin` when no file is given.
fn read_answer(file: Option<&Path>, mut stdin: impl Read) -> Result<String, String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {e}", path.display())),
        None => {
            let mut buf = String::new();
            stdin
                .read_to_string(&mut buf)
                .map_err(|e| format!("Cannot read stdin: {e}"))?;
            Ok(buf)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}
