//! Batch configuration loading and validation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level batch configuration.
///
/// Either section may be left out, but at least one must be present.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CrunchConfig {
    /// Settings shared by every analysis.
    #[serde(default)]
    pub analysis: AnalysisParams,

    /// Frequency-response extraction from an AC plot.
    pub ac: Option<AcConfig>,

    /// Device table from an operating-point plot.
    pub op: Option<OpConfig>,
}

/// Shared analysis settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Frequency (Hz) at which the DC gain is read.
    #[serde(default = "default_reference_frequency")]
    pub reference_frequency: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            reference_frequency: default_reference_frequency(),
        }
    }
}

fn default_reference_frequency() -> f64 {
    lib_dsp::frequency_response::DEFAULT_REFERENCE_FREQUENCY.0
}

/// AC section.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcConfig {
    /// Raw file to read.
    pub raw: PathBuf,

    /// Plot index within the file. Defaults to the first AC plot.
    #[serde(default)]
    pub plot: Option<usize>,

    /// Name of the sweep variable.
    #[serde(default = "default_frequency")]
    pub frequency: String,

    /// Output quantities to analyze.
    #[serde(default = "default_outputs")]
    pub outputs: Vec<String>,
}

fn default_frequency() -> String { "frequency".to_string() }
fn default_outputs() -> Vec<String> { vec!["v(vout)".to_string()] }

/// Operating-point section.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpConfig {
    /// Raw file to read.
    pub raw: PathBuf,

    /// Plot index within the file. Defaults to the first operating-point plot.
    #[serde(default)]
    pub plot: Option<usize>,

    /// Device parameters to extract on top of the defaults.
    #[serde(default)]
    pub variables: Vec<String>,

    /// Named formulas evaluated per device, e.g. `gain = "gm*ro"`.
    #[serde(default)]
    pub expressions: BTreeMap<String, String>,
}

/// Load configuration from a file.
pub fn load_config(path: &Path) -> Result<CrunchConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: CrunchConfig = if path.extension().map_or(false, |e| e == "json") {
        serde_json::from_str(&content)
            .with_context(|| "Failed to parse config as JSON")?
    } else {
        // Assume TOML
        toml::from_str(&content)
            .with_context(|| "Failed to parse config as TOML")?
    };

    validate_config(&config)?;

    Ok(config)
}

/// Validate configuration.
fn validate_config(config: &CrunchConfig) -> Result<()> {
    let reference = config.analysis.reference_frequency;
    if !reference.is_finite() || reference <= 0.0 {
        anyhow::bail!(
            "analysis.reference_frequency must be a positive number of Hz (got {})",
            reference
        );
    }

    if config.ac.is_none() && config.op.is_none() {
        anyhow::bail!("Nothing to do: configure an [ac] or [op] section");
    }

    if let Some(ref ac) = config.ac {
        validate_raw(&ac.raw, "ac")?;
        if ac.outputs.is_empty() {
            anyhow::bail!("ac.outputs must name at least one output quantity");
        }
    }

    if let Some(ref op) = config.op {
        validate_raw(&op.raw, "op")?;
        for (name, text) in &op.expressions {
            lib_dsp::parse_expression(text)
                .with_context(|| format!("Invalid expression op.expressions.{} = {:?}", name, text))?;
        }
    }

    Ok(())
}

fn validate_raw(raw: &Path, section: &str) -> Result<()> {
    if !raw.exists() {
        anyhow::bail!("{} raw file not found: {:?}", section, raw);
    }
    Ok(())
}
