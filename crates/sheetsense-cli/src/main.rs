//! Sheetsense CLI - spreadsheet layout analysis tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sheetsense::prelude::*;
use sheetsense::{chunks_to_json, split_regions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sheetsense")]
#[command(author, version, about = "Spreadsheet layout analysis tool")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a sheet snapshot and print its chunks as JSON
    Analyze {
        /// Sheet snapshot (JSON)
        input: PathBuf,

        /// Output JSON file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write compact JSON instead of pretty-printed
        #[arg(short, long)]
        compact: bool,

        /// Detection mode: heuristic, oracle or heuristic_then_oracle
        #[arg(short, long)]
        mode: Option<DetectionMode>,

        /// Analyzer options file (JSON, missing fields use defaults)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Program to run as the semantic oracle, e.g. "python3 oracle.py"
        #[arg(long)]
        oracle_command: Option<String>,

        /// Seconds the oracle program gets per request
        #[arg(long, default_value_t = 30)]
        oracle_timeout: u64,

        /// Ask the oracle to split regions that hold several blocks
        #[arg(long)]
        refine: bool,
    },

    /// List the whitespace-delimited regions of a sheet snapshot
    Regions {
        /// Sheet snapshot (JSON)
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            input,
            output,
            compact,
            mode,
            options,
            oracle_command,
            oracle_timeout,
            refine,
        } => {
            let mut options = load_options(options.as_deref())?;
            if let Some(mode) = mode {
                options.mode = mode;
            }
            if refine {
                options.refine.enabled = true;
            }
            let oracle = oracle_command
                .as_deref()
                .map(|line| {
                    CommandOracle::from_command_line(line)
                        .map(|o| o.with_timeout(Duration::from_secs(oracle_timeout)))
                })
                .transpose()
                .context("Invalid --oracle-command")?;
            analyze(&input, output.as_deref(), !compact, options, oracle.as_ref())
        }
        Commands::Regions { input } => list_regions(&input),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn load_options(path: Option<&Path>) -> Result<AnalyzerOptions> {
    let Some(path) = path else {
        return Ok(AnalyzerOptions::default());
    };
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid options in '{}'", path.display()))
}

fn open_snapshot(input: &Path) -> Result<SheetSnapshot> {
    SheetSnapshot::open(input).with_context(|| format!("Failed to open '{}'", input.display()))
}

fn analyze(
    input: &Path,
    output: Option<&Path>,
    pretty: bool,
    options: AnalyzerOptions,
    oracle: Option<&CommandOracle>,
) -> Result<()> {
    let snapshot = open_snapshot(input)?;

    if oracle.is_none() && options.mode.uses_oracle() {
        tracing::warn!(mode = %options.mode, "no --oracle-command given; oracle detection will match nothing");
    }

    let analyzer = match oracle {
        Some(oracle) => SheetAnalyzer::with_oracle(options, oracle),
        None => SheetAnalyzer::new(options),
    };
    let chunks = analyzer
        .analyze_snapshot(&snapshot)
        .with_context(|| format!("Failed to analyze '{}'", input.display()))?;
    let json = chunks_to_json(&chunks, pretty).context("Failed to serialize chunks")?;

    if let Some(output_path) = output {
        std::fs::write(output_path, &json)
            .with_context(|| format!("Failed to write '{}'", output_path.display()))?;
        eprintln!("Wrote {} chunks to '{}'", chunks.len(), output_path.display());
    } else {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(json.as_bytes())
            .and_then(|_| stdout.write_all(b"\n"))
            .context("Failed to write to stdout")?;
    }

    Ok(())
}

fn list_regions(input: &Path) -> Result<()> {
    let snapshot = open_snapshot(input)?;
    let grid = snapshot
        .to_grid()
        .with_context(|| format!("Invalid cells in '{}'", input.display()))?;

    let Some(bounds) = grid.bounds() else {
        eprintln!("Warning: Sheet appears to be empty");
        return Ok(());
    };

    if let Some(name) = &snapshot.name {
        println!("Sheet: {}", name);
    }
    println!("Used range: {}", bounds);
    for range in split_regions(&grid, bounds) {
        let cells = grid.region(range).non_empty_cells().len();
        println!("  {:<12} {} cells", range.to_string(), cells);
    }

    Ok(())
}
