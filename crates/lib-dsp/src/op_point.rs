//! Per-device operating-point tables.
//!
//! ngspice saves internal MOSFET quantities as columns named like
//! `@m.xm1.msky130_fd_pr__nfet_01v8[gm]`: a device path, the model instance
//! and the parameter in brackets. This module groups such columns by device
//! and derives the usual design figures from them.

use crate::error::ExprError;
use crate::expression::{parse_expression, Expr};
use indexmap::IndexMap;
use lib_types::plot::{Column, Plot};
use std::collections::{BTreeMap, HashMap};

/// Parameters extracted for every device unless the caller asks for more.
pub const DEFAULT_PARAMETERS: [&str; 6] = ["vds", "vdsat", "gm", "id", "vth", "gds"];

/// Names under which derived values are bound for custom expressions.
pub const DERIVED_NAMES: [&str; 3] = ["gm_id", "v_star", "ro"];

/// A column name split into its device, model and parameter parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceColumn<'a> {
    /// `@m.<path>`, e.g. `@m.xm1`.
    pub device: &'a str,
    pub model: &'a str,
    pub parameter: &'a str,
}

/// Split an internal device column name.
///
/// Text before `@m.` and after the closing bracket is ignored, so wrapped
/// forms such as `v(@m.xm1.nmos[vth])` also match. Returns `None` when the
/// name has no `@m.<path>.<model>[<param>]` part.
pub fn parse_device_column(name: &str) -> Option<DeviceColumn<'_>> {
    let start = name.find("@m.")?;
    let rest = &name[start..];
    let open = rest.find('[')?;
    let close = open + rest[open..].find(']')?;

    let parameter = &rest[open + 1..close];
    let head = &rest[..open];
    let dot = head.rfind('.')?;
    let (device, model) = (&head[..dot], &head[dot + 1..]);

    let path = device.strip_prefix("@m.")?;
    let valid = path.split('.').chain([model]).all(is_word) && !parameter.is_empty();
    valid.then_some(DeviceColumn {
        device,
        model,
        parameter,
    })
}

fn is_word(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Operating point of one device.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceOperatingPoint {
    pub device: String,
    pub model: String,

    /// Extracted parameter values, by parameter name.
    pub params: BTreeMap<String, f64>,

    /// Transconductance efficiency, gm / id.
    pub gm_id: Option<f64>,

    /// Overdrive estimate, 2·id / gm.
    pub v_star: Option<f64>,

    /// Output resistance, 1 / gds.
    pub ro: Option<f64>,

    /// Custom expression results, `None` where evaluation failed.
    pub custom: BTreeMap<String, Option<f64>>,
}

impl DeviceOperatingPoint {
    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    fn derive(&mut self) {
        let gm = self.param("gm");
        let id = self.param("id");
        let gds = self.param("gds");

        self.gm_id = gm.zip(id).map(|(gm, id)| gm / id);
        self.v_star = gm.zip(id).map(|(gm, id)| 2.0 * id / gm);
        self.ro = gds.map(|gds| 1.0 / gds);
    }

    /// Parameters and defined derived values, as expression bindings.
    pub fn bindings(&self) -> HashMap<String, f64> {
        let mut bindings: HashMap<String, f64> = self.params.clone().into_iter().collect();
        for (name, value) in DERIVED_NAMES.iter().zip([self.gm_id, self.v_star, self.ro]) {
            if let Some(value) = value {
                bindings.insert(name.to_string(), value);
            }
        }
        bindings
    }
}

/// Builds [`DeviceOperatingPoint`]s from an operating-point plot.
#[derive(Clone, Debug)]
pub struct OperatingPointExtractor {
    parameters: Vec<String>,
    expressions: Vec<(String, Expr)>,
}

impl Default for OperatingPointExtractor {
    fn default() -> Self {
        Self {
            parameters: DEFAULT_PARAMETERS.iter().map(|p| p.to_string()).collect(),
            expressions: Vec::new(),
        }
    }
}

impl OperatingPointExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract these parameters in addition to the defaults.
    pub fn with_parameters<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in extra {
            self.add_parameter(name.into());
        }
        self
    }

    /// Add a named custom expression. Parameters it references are
    /// extracted automatically.
    pub fn with_expression(
        mut self,
        name: impl Into<String>,
        text: &str,
    ) -> Result<Self, ExprError> {
        let expr = parse_expression(text)?;
        let referenced: Vec<String> = expr
            .variables()
            .into_iter()
            .filter(|v| !DERIVED_NAMES.contains(v))
            .map(str::to_string)
            .collect();
        for parameter in referenced {
            self.add_parameter(parameter);
        }
        self.expressions.push((name.into(), expr));
        Ok(self)
    }

    fn add_parameter(&mut self, name: String) {
        if !self.parameters.contains(&name) {
            self.parameters.push(name);
        }
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Group the plot's device columns, sorted by device path.
    ///
    /// Values come from the first sample of each column (real part for a
    /// complex plot). Columns that are not device parameters, or whose
    /// parameter was not requested, are skipped.
    pub fn extract(&self, plot: &Plot) -> Vec<DeviceOperatingPoint> {
        let mut devices: IndexMap<&str, DeviceOperatingPoint> = IndexMap::new();

        for (index, variable) in plot.variables.iter().enumerate() {
            let Some(parsed) = parse_device_column(&variable.name) else {
                continue;
            };
            if !self.parameters.iter().any(|p| p == parsed.parameter) {
                continue;
            }

            let entry = devices
                .entry(parsed.device)
                .or_insert_with(|| DeviceOperatingPoint {
                    device: parsed.device.to_string(),
                    model: parsed.model.to_string(),
                    ..Default::default()
                });

            match plot.samples.column(index).as_ref().and_then(first_real) {
                Some(value) => {
                    entry.params.insert(parsed.parameter.to_string(), value);
                }
                None => tracing::debug!("Column '{}' has no samples", variable.name),
            }
        }

        devices.sort_keys();
        let mut points: Vec<DeviceOperatingPoint> = devices.into_values().collect();
        for point in &mut points {
            point.derive();
            self.evaluate_custom(point);
        }

        tracing::debug!("Extracted operating points for {} devices", points.len());
        points
    }

    fn evaluate_custom(&self, point: &mut DeviceOperatingPoint) {
        if self.expressions.is_empty() {
            return;
        }
        let bindings = point.bindings();
        for (name, expr) in &self.expressions {
            let value = match expr.evaluate(&bindings) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Expression '{}' on {}: {}", name, point.device, e);
                    None
                }
            };
            point.custom.insert(name.clone(), value);
        }
    }
}

/// Extract with the default parameter list and no expressions.
pub fn extract_operating_points(plot: &Plot) -> Vec<DeviceOperatingPoint> {
    OperatingPointExtractor::default().extract(plot)
}

fn first_real(column: &Column) -> Option<f64> {
    match column {
        Column::Real(values) => values.first().copied(),
        Column::Complex(values) => values.first().map(|v| v.re),
    }
}
