//! Crunch CLI: decode ngspice raw files and extract figures of merit.
//!
//! This is the main entry point for the `crunch` tool.

mod config;
mod orchestrator;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lib_types::units::Hertz;
use lib_types::plot::AnalysisKind;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "crunch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// List the plots, metadata and variables in a raw file
    Inspect {
        /// Path to the .raw file
        raw: PathBuf,
    },

    /// Extract frequency-response metrics from an AC plot
    Ac {
        /// Path to the .raw file
        raw: PathBuf,

        /// Plot index (defaults to the first AC plot)
        #[arg(long)]
        plot: Option<usize>,

        /// Name of the sweep variable
        #[arg(long, default_value = "frequency")]
        frequency: String,

        /// Output quantity to analyze (repeatable)
        #[arg(short, long = "output", default_values_t = vec!["v(vout)".to_string()])]
        outputs: Vec<String>,

        /// Frequency (Hz) at which the DC gain is read
        #[arg(long, default_value_t = lib_dsp::frequency_response::DEFAULT_REFERENCE_FREQUENCY.0)]
        reference_frequency: f64,
    },

    /// Tabulate device operating points from an OP plot
    Op {
        /// Path to the .raw file
        raw: PathBuf,

        /// Plot index (defaults to the first operating-point plot)
        #[arg(long)]
        plot: Option<usize>,

        /// Extra device parameter to extract (repeatable)
        #[arg(long = "var")]
        variables: Vec<String>,

        /// Custom expression NAME=EXPR evaluated per device (repeatable)
        #[arg(long = "expr", value_parser = parse_named_expression)]
        expressions: Vec<(String, String)>,
    },

    /// Read one curve at a given x value
    Lookup {
        /// Path to the .raw file
        raw: PathBuf,

        /// Plot index
        #[arg(long, default_value = "0")]
        plot: usize,

        /// Independent variable
        #[arg(long)]
        x: String,

        /// Dependent variable
        #[arg(long)]
        y: String,

        /// x value to read at
        #[arg(long, allow_negative_numbers = true)]
        at: f64,

        /// Read the nearest sample instead of interpolating
        #[arg(long)]
        nearest: bool,
    },

    /// Run the analyses described by a configuration file
    Run {
        /// Path to the configuration file (.toml or .json)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Inspect { raw } => {
            let plots = orchestrator::load_plots(&raw)?;
            output::write_inspect(&mut out, &plots, cli.format)?;
        }
        Commands::Ac { raw, plot, frequency, outputs, reference_frequency } => {
            run_ac(&mut out, &raw, plot, &frequency, &outputs, reference_frequency, cli.format)?;
        }
        Commands::Op { raw, plot, variables, expressions } => {
            run_op(&mut out, &raw, plot, &variables, &expressions, cli.format)?;
        }
        Commands::Lookup { raw, plot, x, y, at, nearest } => {
            let plots = orchestrator::load_plots(&raw)?;
            let plot = plots
                .get(plot)
                .with_context(|| format!("Plot index {} out of range ({} plot(s))", plot, plots.len()))?;
            let result = orchestrator::lookup(plot, &x, &y, at, nearest)?;
            output::write_lookup(&mut out, &result, cli.format)?;
        }
        Commands::Run { config } => {
            run_config(&mut out, &config, cli.format)?;
        }
    }

    Ok(())
}

fn run_ac(
    out: &mut impl std::io::Write,
    raw: &Path,
    plot: Option<usize>,
    frequency: &str,
    outputs: &[String],
    reference_frequency: f64,
    format: OutputFormat,
) -> Result<()> {
    if !reference_frequency.is_finite() || reference_frequency <= 0.0 {
        anyhow::bail!("--reference-frequency must be positive (got {})", reference_frequency);
    }
    let reference = Hertz(reference_frequency);

    let plots = orchestrator::load_plots(raw)?;
    let (plot_index, selected) = orchestrator::select_plot(&plots, plot, AnalysisKind::Ac)?;
    tracing::info!("Analyzing {} output(s) from plot {}", outputs.len(), plot_index);

    let report = orchestrator::AcReport {
        source: raw.to_path_buf(),
        plot_index,
        plotname: selected.plotname().unwrap_or_default().to_string(),
        reference_frequency: reference,
        outputs: orchestrator::analyze_ac(selected, frequency, outputs, reference)?,
    };
    output::write_ac(out, &report, format)
}

fn run_op(
    out: &mut impl std::io::Write,
    raw: &Path,
    plot: Option<usize>,
    variables: &[String],
    expressions: &[(String, String)],
    format: OutputFormat,
) -> Result<()> {
    let plots = orchestrator::load_plots(raw)?;
    let (plot_index, selected) = orchestrator::select_plot(&plots, plot, AnalysisKind::Op)?;

    let report = orchestrator::OpReport {
        source: raw.to_path_buf(),
        plot_index,
        plotname: selected.plotname().unwrap_or_default().to_string(),
        devices: orchestrator::analyze_op(selected, variables, expressions)?,
    };
    output::write_op(out, &report, format)
}

fn run_config(out: &mut impl std::io::Write, config_path: &Path, format: OutputFormat) -> Result<()> {
    tracing::info!("Loading configuration from {:?}", config_path);

    let config = config::load_config(config_path)?;
    let orchestrator = orchestrator::Orchestrator::new(config)?;
    let results = orchestrator.run()?;

    output::write_run(out, &results, format)
}

/// Split `NAME=EXPR` for `--expr`.
fn parse_named_expression(arg: &str) -> Result<(String, String), String> {
    let (name, expr) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=EXPR, got '{}'", arg))?;
    let (name, expr) = (name.trim(), expr.trim());
    if name.is_empty() || expr.is_empty() {
        return Err(format!("expected NAME=EXPR, got '{}'", arg));
    }
    Ok((name.to_string(), expr.to_string()))
}
