//! docsift command-line interface.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docsift::plugins::{ExtractionStrategy, Plugin};
use docsift::{Dispatcher, ExtractionOptions, ExtractionResult, extraction_options_for, file_info};
use tracing_subscriber::EnvFilter;

const RULE: &str = "----------------------------------------";

#[derive(Parser)]
#[command(name = "docsift")]
#[command(version)]
#[command(about = "Extract reading-order text from documents", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the content of a document
    Extract {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Truncate the content to a summary
        #[arg(long)]
        summarize: bool,

        /// Summary length in characters
        #[arg(long, value_name = "N")]
        max_length: Option<usize>,

        /// Only emit document properties
        #[arg(long)]
        metadata_only: bool,

        /// Restrict spreadsheets to one sheet
        #[arg(long, value_name = "NAME")]
        sheet: Option<String>,

        /// Restrict spreadsheets to a cell range such as A1:C10
        #[arg(long, value_name = "RANGE")]
        range: Option<String>,

        /// Options file (.toml, .yaml, .yml or .json); defaults to a discovered docsift.* file
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Also write the content to <stem>_extracted.txt next to the input
        #[arg(long)]
        save: bool,
    },

    /// Show file details, the strategy chain and accepted options as JSON
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// List supported extensions and their strategy chains
    Formats,

    /// Show the options accepted for an extension as JSON
    Options {
        #[arg(value_name = "EXT")]
        extension: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "docsift=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn normalize_extension(extension: &str) -> String {
    format!(".{}", extension.trim_start_matches('.').to_ascii_lowercase())
}

fn load_options(config: Option<&Path>) -> Result<ExtractionOptions> {
    match config {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading options file");
            ExtractionOptions::from_file(path).with_context(|| format!("loading {}", path.display()))
        }
        None => {
            let discovered = ExtractionOptions::discover()?;
            if discovered.is_none() {
                tracing::debug!("No docsift config file found, using defaults");
            }
            Ok(discovered.unwrap_or_default())
        }
    }
}

fn saved_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    input.with_file_name(format!("{}_extracted.txt", stem))
}

fn print_result(result: &ExtractionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text => {
            println!("File: {} ({})", result.file_path, result.file_type);
            println!("{}", RULE);
            println!("{}", result.content.as_deref().unwrap_or_default());
        }
    }
    Ok(())
}

async fn run(command: Commands) -> Result<ExitCode> {
    let dispatcher = Dispatcher::global();
    match command {
        Commands::Extract {
            file,
            format,
            summarize,
            max_length,
            metadata_only,
            sheet,
            range,
            config,
            save,
        } => {
            let mut options = load_options(config.as_deref())?;
            options.summarize |= summarize;
            options.metadata_only |= metadata_only;
            if let Some(max_length) = max_length {
                options.max_length = max_length;
            }
            if sheet.is_some() {
                options.sheet_name = sheet;
            }
            if range.is_some() {
                options.cell_range = range;
            }

            let result = dispatcher.extract(&file, &options).await;
            if !result.success {
                match format {
                    OutputFormat::Json => print_result(&result, format)?,
                    OutputFormat::Text => {
                        eprintln!("Error: {}", result.error.as_deref().unwrap_or("extraction failed"))
                    }
                }
                return Ok(ExitCode::FAILURE);
            }

            print_result(&result, format)?;
            if save {
                let target = saved_path(&file);
                std::fs::write(&target, result.content.as_deref().unwrap_or_default())
                    .with_context(|| format!("writing {}", target.display()))?;
                eprintln!("Saved to {}", target.display());
            }
        }
        Commands::Info { file } => {
            let info = file_info(&file, dispatcher)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Formats => {
            let registry = dispatcher.registry();
            let caps = dispatcher.capabilities();
            for extension in registry.extensions() {
                let chain: Vec<String> = registry
                    .chain(&extension)
                    .iter()
                    .map(|s| {
                        if s.is_available(caps) {
                            s.name().to_string()
                        } else {
                            format!("{} (unavailable)", s.name())
                        }
                    })
                    .collect();
                println!("{:<8} {}", extension, chain.join(" -> "));
            }
        }
        Commands::Options { extension } => {
            let extension = normalize_extension(&extension);
            if !dispatcher.registry().supports(&extension) {
                eprintln!("Error: unsupported file type {}", extension);
                return Ok(ExitCode::FAILURE);
            }
            let options = extraction_options_for(&extension, dispatcher.capabilities());
            println!("{}", serde_json::to_string_pretty(&options)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
