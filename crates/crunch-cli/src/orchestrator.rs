//! Analysis orchestration.
//!
//! Each subcommand and each section of a batch config goes through the same
//! steps: decode the raw file, pick a plot, pull named columns out of it and
//! hand them to the analysis library.

use crate::config::{AcConfig, CrunchConfig, OpConfig};
use anyhow::{Context, Result};
use lib_dsp::{
    interpolate, nearest_index, DeviceOperatingPoint, FrequencyResponseAnalyzer,
    OperatingPointExtractor,
};
use lib_rawfile::{decode_file, WaveformTable};
use lib_types::metrics::FrequencyResponseMetrics;
use lib_types::plot::{find_plot, AnalysisKind, Plot};
use lib_types::units::Hertz;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Metrics for one output quantity.
#[derive(Clone, Debug)]
pub struct OutputMetrics {
    pub name: String,
    pub metrics: FrequencyResponseMetrics,
}

/// Result of an AC run.
#[derive(Clone, Debug)]
pub struct AcReport {
    pub source: PathBuf,
    pub plot_index: usize,
    pub plotname: String,
    pub reference_frequency: Hertz,
    pub outputs: Vec<OutputMetrics>,
}

/// Result of an operating-point run.
#[derive(Clone, Debug)]
pub struct OpReport {
    pub source: PathBuf,
    pub plot_index: usize,
    pub plotname: String,
    pub devices: Vec<DeviceOperatingPoint>,
}

/// Everything a batch run produced.
#[derive(Clone, Debug, Default)]
pub struct RunResults {
    pub ac: Option<AcReport>,
    pub op: Option<OpReport>,
}

/// Cursor readout on one curve.
#[derive(Clone, Debug)]
pub struct LookupResult {
    pub x_name: String,
    pub y_name: String,
    pub at: f64,
    /// Sample position actually read, when a nearest-sample lookup was used.
    pub index: Option<usize>,
    pub value: f64,
}

/// Batch runner for a [`CrunchConfig`].
pub struct Orchestrator {
    config: CrunchConfig,
}

impl Orchestrator {
    pub fn new(config: CrunchConfig) -> Result<Self> {
        Ok(Self { config })
    }

    /// Run the configured sections.
    pub fn run(&self) -> Result<RunResults> {
        let reference = Hertz(self.config.analysis.reference_frequency);
        let mut results = RunResults::default();

        if let Some(ref ac) = self.config.ac {
            tracing::info!("Running AC section on {:?}", ac.raw);
            results.ac = Some(run_ac(ac, reference)?);
        }

        if let Some(ref op) = self.config.op {
            tracing::info!("Running OP section on {:?}", op.raw);
            results.op = Some(run_op(op)?);
        }

        Ok(results)
    }
}

/// Decode a raw file, attaching the path to any failure.
pub fn load_plots(path: &Path) -> Result<Vec<Plot>> {
    decode_file(path).with_context(|| format!("Failed to decode raw file: {:?}", path))
}

/// Pick a plot by explicit index, or else the first one of `kind`.
pub fn select_plot(plots: &[Plot], index: Option<usize>, kind: AnalysisKind) -> Result<(usize, &Plot)> {
    let selected = match index {
        Some(i) => plots.get(i).map(|plot| (i, plot)),
        None => find_plot(plots, kind),
    };

    selected.ok_or_else(|| {
        let available: Vec<String> = plots
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}: {}", i, p.plotname().unwrap_or("<unnamed>")))
            .collect();
        let wanted = match index {
            Some(i) => format!("plot index {}", i),
            None => format!("a '{}' plot", kind.plotname()),
        };
        anyhow::anyhow!(
            "No {} in file ({} plot(s) available: [{}])",
            wanted,
            plots.len(),
            available.join(", ")
        )
    })
}

/// Analyze each output column of an AC plot in parallel.
pub fn analyze_ac(
    plot: &Plot,
    frequency: &str,
    outputs: &[String],
    reference: Hertz,
) -> Result<Vec<OutputMetrics>> {
    let table = WaveformTable::new(plot);
    let freq = table.real_column(frequency)?;
    let analyzer = FrequencyResponseAnalyzer::with_reference_frequency(reference);

    outputs
        .par_iter()
        .map(|name| -> Result<OutputMetrics> {
            let vout = table.complex_column(name)?;
            let metrics = analyzer
                .analyze(&freq, &vout)
                .with_context(|| format!("Failed to analyze {}", name))?;
            tracing::debug!("Analyzed {} ({} points)", name, metrics.len());
            Ok(OutputMetrics {
                name: name.clone(),
                metrics,
            })
        })
        .collect()
}

/// Build the device table for an operating-point plot.
pub fn analyze_op(
    plot: &Plot,
    variables: &[String],
    expressions: &[(String, String)],
) -> Result<Vec<DeviceOperatingPoint>> {
    let mut extractor = OperatingPointExtractor::new().with_parameters(variables.iter().cloned());
    for (name, text) in expressions {
        extractor = extractor
            .with_expression(name.clone(), text)
            .with_context(|| format!("Invalid expression {} = {:?}", name, text))?;
    }

    let devices = extractor.extract(plot);
    if devices.is_empty() {
        tracing::warn!("No device parameter columns (@m.<device>.<model>[<param>]) in plot");
    }
    Ok(devices)
}

/// Read `y` at `x = at`, interpolated or at the nearest sample.
pub fn lookup(plot: &Plot, x_name: &str, y_name: &str, at: f64, nearest: bool) -> Result<LookupResult> {
    let table = WaveformTable::new(plot);
    let x = table.real_column(x_name)?;
    let y = table.real_column(y_name)?;

    let (index, value) = if nearest {
        let index = nearest_index(&x, at)
            .with_context(|| format!("'{}' has no comparable samples", x_name))?;
        (Some(index), y[index])
    } else {
        (None, interpolate(&x, &y, at)?)
    };

    Ok(LookupResult {
        x_name: x_name.to_string(),
        y_name: y_name.to_string(),
        at,
        index,
        value,
    })
}

fn run_ac(config: &AcConfig, reference: Hertz) -> Result<AcReport> {
    let plots = load_plots(&config.raw)?;
    let (plot_index, plot) = select_plot(&plots, config.plot, AnalysisKind::Ac)?;
    let outputs = analyze_ac(plot, &config.frequency, &config.outputs, reference)?;

    Ok(AcReport {
        source: config.raw.clone(),
        plot_index,
        plotname: plot.plotname().unwrap_or_default().to_string(),
        reference_frequency: reference,
        outputs,
    })
}

fn run_op(config: &OpConfig) -> Result<OpReport> {
    let plots = load_plots(&config.raw)?;
    let (plot_index, plot) = select_plot(&plots, config.plot, AnalysisKind::Op)?;
    let expressions: Vec<(String, String)> = config
        .expressions
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let devices = analyze_op(plot, &config.variables, &expressions)?;

    Ok(OpReport {
        source: config.raw.clone(),
        plot_index,
        plotname: plot.plotname().unwrap_or_default().to_string(),
        devices,
    })
}
