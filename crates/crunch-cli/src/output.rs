//! Result formatting for the terminal and for tooling.

use crate::orchestrator::{AcReport, LookupResult, OpReport, RunResults};
use crate::OutputFormat;
use anyhow::Result;
use lib_dsp::DeviceOperatingPoint;
use lib_types::metrics::FrequencyResponseMetrics;
use lib_types::plot::Plot;
use std::io::Write;

const SI_PREFIXES: [(f64, &str); 10] = [
    (1e12, "T"),
    (1e9, "G"),
    (1e6, "M"),
    (1e3, "k"),
    (1.0, ""),
    (1e-3, "m"),
    (1e-6, "μ"),
    (1e-9, "n"),
    (1e-12, "p"),
    (1e-15, "f"),
];

/// Format a value with an SI prefix and two decimals, e.g. `1.50k`.
///
/// Magnitudes below a femto fall through to atto. NaN prints as `NaN`.
pub fn format_engineering(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 || value.is_infinite() {
        return format!("{:.2}", value);
    }

    let magnitude = value.abs();
    for (scale, prefix) in SI_PREFIXES {
        if magnitude >= scale {
            return format!("{:.2}{}", value / scale, prefix);
        }
    }
    format!("{:.2}a", value * 1e18)
}

fn format_optional(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{}{}", format_engineering(v), unit),
        None => "undefined".to_string(),
    }
}

fn csv_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Summarize every plot in a file.
pub fn write_inspect<W: Write>(out: &mut W, plots: &[Plot], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "{} plot(s)", plots.len())?;
            for (index, plot) in plots.iter().enumerate() {
                writeln!(out)?;
                writeln!(out, "[{}] {}", index, plot.plotname().unwrap_or("<unnamed>"))?;
                for (keyword, value) in &plot.metadata {
                    writeln!(out, "  {:<15} {}", format!("{}:", keyword), value)?;
                }
                writeln!(out, "  {} variable(s) x {} point(s):", plot.num_variables(), plot.num_points())?;
                for variable in &plot.variables {
                    writeln!(out, "    {:>4}  {:<40} {}", variable.ordinal, variable.name, variable.unit)?;
                }
            }
        }
        OutputFormat::Json => {
            let json: Vec<_> = plots
                .iter()
                .enumerate()
                .map(|(index, plot)| {
                    serde_json::json!({
                        "index": index,
                        "plotname": plot.plotname(),
                        "complex": plot.is_complex(),
                        "points": plot.num_points(),
                        "metadata": plot.metadata,
                        "variables": plot.variables,
                    })
                })
                .collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "plot,plotname,ordinal,name,unit")?;
            for (index, plot) in plots.iter().enumerate() {
                for variable in &plot.variables {
                    writeln!(
                        out,
                        "{},{},{},{},{}",
                        index,
                        plot.plotname().unwrap_or_default(),
                        variable.ordinal,
                        variable.name,
                        variable.unit
                    )?;
                }
            }
        }
    }
    Ok(())
}

/// Frequency-response metrics for each analyzed output.
pub fn write_ac<W: Write>(out: &mut W, report: &AcReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(
                out,
                "AC metrics from {:?} [plot {}: {}], DC gain read at {}Hz",
                report.source,
                report.plot_index,
                report.plotname,
                format_engineering(report.reference_frequency.0)
            )?;
            for output in &report.outputs {
                writeln!(out)?;
                writeln!(out, "{}", output.name)?;
                write_metrics_text(out, &output.metrics)?;
            }
        }
        OutputFormat::Json => {
            let outputs: Vec<_> = report
                .outputs
                .iter()
                .map(|o| serde_json::json!({ "name": o.name, "metrics": o.metrics }))
                .collect();
            let json = serde_json::json!({
                "source": report.source,
                "plot_index": report.plot_index,
                "plotname": report.plotname,
                "reference_frequency": report.reference_frequency.0,
                "outputs": outputs,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "output,metric,value")?;
            for output in &report.outputs {
                let m = &output.metrics;
                let rows = [
                    ("dc_gain", m.dc_gain),
                    ("dc_gain_db", m.dc_gain_db.map(|v| v.0)),
                    ("unity_gain_freq", m.unity_gain_freq.map(|v| v.0)),
                    ("phase_margin_at_ugf", m.phase_margin_at_ugf.map(|v| v.0)),
                    ("bandwidth_3db", m.bandwidth_3db.map(|v| v.0)),
                    ("gain_bandwidth_product", m.gain_bandwidth_product.map(|v| v.0)),
                ];
                for (metric, value) in rows {
                    writeln!(out, "{},{},{}", output.name, metric, csv_optional(value))?;
                }
            }
        }
    }
    Ok(())
}

fn write_metrics_text<W: Write>(out: &mut W, m: &FrequencyResponseMetrics) -> Result<()> {
    let dc_gain = match (m.dc_gain, m.dc_gain_db) {
        (Some(a0), Some(db)) => format!("{} ({:.2} dB)", format_engineering(a0), db.0),
        _ => "undefined".to_string(),
    };
    writeln!(out, "  DC gain:         {}", dc_gain)?;
    writeln!(out, "  Unity-gain freq: {}", format_optional(m.unity_gain_freq.map(|v| v.0), "Hz"))?;
    writeln!(
        out,
        "  Phase margin:    {}",
        m.phase_margin_at_ugf
            .map(|pm| format!("{:.2}°", pm.0))
            .unwrap_or_else(|| "undefined".to_string())
    )?;
    writeln!(out, "  3 dB bandwidth:  {}", format_optional(m.bandwidth_3db.map(|v| v.0), "Hz"))?;
    writeln!(out, "  GBW:             {}", format_optional(m.gain_bandwidth_product.map(|v| v.0), "Hz"))?;
    for diagnostic in &m.diagnostics {
        writeln!(out, "  ! {}: {}", diagnostic.metric, diagnostic.reason)?;
    }
    Ok(())
}

/// Per-device operating point table.
pub fn write_op<W: Write>(out: &mut W, report: &OpReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(
                out,
                "Operating point from {:?} [plot {}: {}], {} device(s)",
                report.source,
                report.plot_index,
                report.plotname,
                report.devices.len()
            )?;
            for device in &report.devices {
                writeln!(out)?;
                writeln!(out, "{} ({})", device.device, device.model)?;
                for (name, value) in &device.params {
                    writeln!(out, "  {:<12} {}", name, format_engineering(*value))?;
                }
                for (name, value) in derived(device) {
                    writeln!(out, "  {:<12} {}", name, format_optional(value, ""))?;
                }
                for (name, value) in &device.custom {
                    writeln!(out, "  {:<12} {}", name, format_optional(*value, ""))?;
                }
            }
        }
        OutputFormat::Json => {
            let devices: Vec<_> = report
                .devices
                .iter()
                .map(|d| {
                    serde_json::json!({
                        "device": d.device,
                        "model": d.model,
                        "params": d.params,
                        "gm_id": d.gm_id,
                        "v_star": d.v_star,
                        "ro": d.ro,
                        "custom": d.custom,
                    })
                })
                .collect();
            let json = serde_json::json!({
                "source": report.source,
                "plot_index": report.plot_index,
                "plotname": report.plotname,
                "devices": devices,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "device,model,quantity,value")?;
            for device in &report.devices {
                let params = device.params.iter().map(|(k, v)| (k.as_str(), Some(*v)));
                let custom = device.custom.iter().map(|(k, v)| (k.as_str(), *v));
                for (name, value) in params.chain(derived(device)).chain(custom) {
                    writeln!(out, "{},{},{},{}", device.device, device.model, name, csv_optional(value))?;
                }
            }
        }
    }
    Ok(())
}

fn derived(device: &DeviceOperatingPoint) -> [(&'static str, Option<f64>); 3] {
    [("gm/id", device.gm_id), ("v_star", device.v_star), ("ro", device.ro)]
}

/// Single cursor readout.
pub fn write_lookup<W: Write>(out: &mut W, result: &LookupResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let at_sample = result
                .index
                .map(|i| format!(" (sample {})", i))
                .unwrap_or_default();
            writeln!(
                out,
                "{} at {} = {}{}: {}",
                result.y_name,
                result.x_name,
                format_engineering(result.at),
                at_sample,
                format_engineering(result.value)
            )?;
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "x": result.x_name,
                "y": result.y_name,
                "at": result.at,
                "index": result.index,
                "value": result.value,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "x,y,at,index,value")?;
            writeln!(
                out,
                "{},{},{},{},{}",
                result.x_name,
                result.y_name,
                result.at,
                result.index.map(|i| i.to_string()).unwrap_or_default(),
                result.value
            )?;
        }
    }
    Ok(())
}

/// Everything a batch run produced, section by section.
pub fn write_run<W: Write>(out: &mut W, results: &RunResults, format: OutputFormat) -> Result<()> {
    if let Some(ref ac) = results.ac {
        write_ac(out, ac, format)?;
    }
    if let Some(ref op) = results.op {
        if results.ac.is_some() && matches!(format, OutputFormat::Text) {
            writeln!(out)?;
        }
        write_op(out, op, format)?;
    }
    Ok(())
}
