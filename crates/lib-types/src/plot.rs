//! Decoded simulation analyses.
//!
//! A raw-result file holds one or more *plots*, each the output of a single
//! analysis (operating point, AC sweep, transient, ...). A plot carries its
//! header metadata in the order it was written, the variable descriptors and
//! a `points × variables` sample matrix whose element type (real or complex)
//! is fixed for the whole plot.

use indexmap::IndexMap;
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Header keywords, lower-cased as they are stored in [`Metadata`].
pub mod keywords {
    pub const TITLE: &str = "title";
    pub const DATE: &str = "date";
    pub const PLOTNAME: &str = "plotname";
    pub const FLAGS: &str = "flags";
    pub const NO_VARIABLES: &str = "no. variables";
    pub const NO_POINTS: &str = "no. points";
    pub const DIMENSIONS: &str = "dimensions";
    pub const COMMAND: &str = "command";
    pub const OPTION: &str = "option";
    pub const VARIABLES: &str = "variables";
    pub const BINARY: &str = "binary";

    /// Token in the flags value that selects complex samples.
    pub const COMPLEX_FLAG: &str = "complex";
}

/// Insertion-ordered header keyword → value mapping.
pub type Metadata = IndexMap<String, String>;

/// One column descriptor from the variables section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Column name after collision resolution.
    pub name: String,

    /// Unit or quantity type as written by the simulator (e.g. `voltage`).
    pub unit: String,

    /// Zero-based position within the plot.
    pub ordinal: usize,
}

/// Element type of a plot's samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    /// One `f64` per cell (8 bytes).
    Real,
    /// Two `f64`s per cell (16 bytes).
    Complex,
}

impl ElementKind {
    /// Select the element kind from a plot's flags value. The match is
    /// case-sensitive: `Complex` is not a complex plot.
    pub fn from_flags(flags: &str) -> Self {
        if flags.contains(keywords::COMPLEX_FLAG) {
            Self::Complex
        } else {
            Self::Real
        }
    }

    /// Size of one encoded cell in bytes.
    #[inline]
    pub fn width(&self) -> usize {
        match self {
            Self::Real => 8,
            Self::Complex => 16,
        }
    }
}

/// Row-major sample matrix: one row per point, one column per variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SampleMatrix {
    Real(Array2<f64>),
    Complex(Array2<Complex64>),
}

impl SampleMatrix {
    /// Element kind of every cell.
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Real(_) => ElementKind::Real,
            Self::Complex(_) => ElementKind::Complex,
        }
    }

    /// Number of points (rows).
    pub fn nrows(&self) -> usize {
        match self {
            Self::Real(m) => m.nrows(),
            Self::Complex(m) => m.nrows(),
        }
    }

    /// Number of variables (columns).
    pub fn ncols(&self) -> usize {
        match self {
            Self::Real(m) => m.ncols(),
            Self::Complex(m) => m.ncols(),
        }
    }

    /// Copy out one column.
    ///
    /// Returns `None` if `index` is out of range.
    pub fn column(&self, index: usize) -> Option<Column> {
        if index >= self.ncols() {
            return None;
        }
        Some(match self {
            Self::Real(m) => Column::Real(m.column(index).to_vec()),
            Self::Complex(m) => Column::Complex(m.column(index).to_vec()),
        })
    }
}

/// One extracted column of samples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl Column {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Real(v) => v.len(),
            Self::Complex(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Real(_) => ElementKind::Real,
            Self::Complex(_) => ElementKind::Complex,
        }
    }

    /// Real values, or the real parts of complex values.
    ///
    /// Sweep variables such as `frequency` are stored as complex numbers with
    /// a zero imaginary part in AC plots; this is how callers read them back.
    pub fn real_parts(&self) -> Vec<f64> {
        match self {
            Self::Real(v) => v.clone(),
            Self::Complex(v) => v.iter().map(|c| c.re).collect(),
        }
    }

    /// Complex values, promoting reals with a zero imaginary part.
    pub fn to_complex(&self) -> Vec<Complex64> {
        match self {
            Self::Real(v) => v.iter().map(|&re| Complex64::new(re, 0.0)).collect(),
            Self::Complex(v) => v.clone(),
        }
    }
}

/// One simulation analysis result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    /// Header keywords in the order they appeared.
    pub metadata: Metadata,

    /// Column descriptors, `variables[i].ordinal == i`.
    pub variables: Vec<Variable>,

    /// Sample matrix with `variables.len()` columns.
    pub samples: SampleMatrix,
}

impl Plot {
    /// Assemble a plot.
    ///
    /// # Panics
    ///
    /// Panics if the matrix column count does not match the variable count.
    pub fn new(metadata: Metadata, variables: Vec<Variable>, samples: SampleMatrix) -> Self {
        assert_eq!(
            samples.ncols(),
            variables.len(),
            "Sample matrix has {} columns but {} variables were declared",
            samples.ncols(),
            variables.len()
        );
        Self { metadata, variables, samples }
    }

    /// Look up a header value by lower-case keyword.
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.metadata.get(keyword).map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.get(keywords::TITLE)
    }

    pub fn plotname(&self) -> Option<&str> {
        self.get(keywords::PLOTNAME)
    }

    pub fn flags(&self) -> Option<&str> {
        self.get(keywords::FLAGS)
    }

    /// Analysis type, if the plotname is one we recognise.
    pub fn analysis_kind(&self) -> Option<AnalysisKind> {
        self.plotname().and_then(AnalysisKind::from_plotname)
    }

    /// Number of points (matrix rows).
    #[inline]
    pub fn num_points(&self) -> usize {
        self.samples.nrows()
    }

    /// Number of variables (matrix columns).
    #[inline]
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    #[inline]
    pub fn is_complex(&self) -> bool {
        self.samples.kind() == ElementKind::Complex
    }

    /// Variable names in column order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }

    /// Column position of a variable name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }
}

/// Analysis types that can be located by plotname.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Op,
    Dc,
    Ac,
    Tran,
    Noise,
    /// Loop-stability run; ngspice writes it as an ordinary AC plot.
    Stb,
}

impl AnalysisKind {
    /// Plotname the simulator writes for this analysis.
    pub fn plotname(&self) -> &'static str {
        match self {
            Self::Op => "Operating Point",
            Self::Dc => "DC transfer characteristic",
            Self::Ac | Self::Stb => "AC Analysis",
            Self::Tran => "Transient Analysis",
            Self::Noise => "Noise Spectral Density Curves",
        }
    }

    /// Map a plotname back to an analysis kind.
    ///
    /// `AC Analysis` resolves to [`AnalysisKind::Ac`].
    pub fn from_plotname(plotname: &str) -> Option<Self> {
        [Self::Op, Self::Dc, Self::Ac, Self::Tran, Self::Noise]
            .into_iter()
            .find(|kind| kind.plotname().eq_ignore_ascii_case(plotname.trim()))
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Op => "op",
            Self::Dc => "dc",
            Self::Ac => "ac",
            Self::Tran => "tran",
            Self::Noise => "noise",
            Self::Stb => "stb",
        };
        f.write_str(name)
    }
}

impl FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "op" => Ok(Self::Op),
            "dc" => Ok(Self::Dc),
            "ac" => Ok(Self::Ac),
            "tran" => Ok(Self::Tran),
            "noise" => Ok(Self::Noise),
            "stb" => Ok(Self::Stb),
            other => Err(format!(
                "Unsupported analysis '{}': expected one of op, dc, ac, tran, noise, stb",
                other
            )),
        }
    }
}

/// Find the first plot produced by the given analysis.
pub fn find_plot(plots: &[Plot], kind: AnalysisKind) -> Option<(usize, &Plot)> {
    plots
        .iter()
        .enumerate()
        .find(|(_, plot)| {
            plot.plotname()
                .is_some_and(|name| name.trim().eq_ignore_ascii_case(kind.plotname()))
        })
}
