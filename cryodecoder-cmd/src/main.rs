mod decode;
mod info;

use std::io::stderr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cryodecoder::schema::Schema;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode every frame in a receiver log or storage card image.
    ///
    /// Frames are written to stdout in the order they occur in the input, one per line.
    /// Frames that fail to decode are reported with their offset and error but do not
    /// stop decoding.
    Decode {
        /// Schema document to use instead of the built-in schema.
        #[arg(short, long, value_name = "path")]
        schema: Option<PathBuf>,

        /// Number of decode threads. Defaults to one per cpu.
        #[arg(short, long)]
        threads: Option<usize>,

        /// Output format. json writes one JSON object per line.
        #[arg(short, long, default_value = "json")]
        format: info::Format,

        /// Input file
        input: PathBuf,
    },
    /// Show frame counts, time range, and instruments in a receiver log
    Info {
        /// Schema document to use instead of the built-in schema.
        #[arg(short, long, value_name = "path")]
        schema: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,

        /// Input file
        input: PathBuf,
    },
}

fn load_schema(path: Option<&Path>) -> Result<Schema> {
    match path {
        Some(path) => {
            debug!("loading schema from {path:?}");
            Schema::with_file(path).with_context(|| format!("loading schema {path:?}"))
        }
        None => Ok(Schema::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("CRYODECODER_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Decode {
            schema,
            threads,
            format,
            input,
        } => {
            let schema = load_schema(schema.as_deref())?;
            decode::decode(input, &schema, *threads, format)
        }
        Commands::Info {
            schema,
            format,
            input,
        } => {
            let schema = load_schema(schema.as_deref())?;
            info::info(input, &schema, format)
        }
    }
}
