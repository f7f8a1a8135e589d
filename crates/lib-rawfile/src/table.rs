//! Named-column access to a decoded plot.

use crate::error::ColumnNotFound;
use lib_types::plot::{Column, ElementKind, Plot};
use lib_types::Complex64;

/// Columnar view over one plot's samples.
#[derive(Clone, Copy, Debug)]
pub struct WaveformTable<'a> {
    plot: &'a Plot,
}

impl<'a> WaveformTable<'a> {
    pub fn new(plot: &'a Plot) -> Self {
        Self { plot }
    }

    pub fn plot(&self) -> &'a Plot {
        self.plot
    }

    /// Column names in order.
    pub fn names(&self) -> Vec<&'a str> {
        self.plot.variable_names().collect()
    }

    /// Number of rows (points).
    #[inline]
    pub fn len(&self) -> usize {
        self.plot.num_points()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.plot.samples.kind()
    }

    /// Extract a column by exact name.
    pub fn column(&self, name: &str) -> Result<Column, ColumnNotFound> {
        self.plot
            .position(name)
            .and_then(|index| self.plot.samples.column(index))
            .ok_or_else(|| ColumnNotFound {
                requested: name.to_string(),
                available: self.names().into_iter().map(str::to_string).collect(),
            })
    }

    /// Extract a column as real values (real parts for complex plots).
    pub fn real_column(&self, name: &str) -> Result<Vec<f64>, ColumnNotFound> {
        self.column(name).map(|c| c.real_parts())
    }

    /// Extract a column as complex values (zero imaginary part for real plots).
    pub fn complex_column(&self, name: &str) -> Result<Vec<Complex64>, ColumnNotFound> {
        self.column(name).map(|c| c.to_complex())
    }
}

/// Extract a named column from a plot.
pub fn column(plot: &Plot, name: &str) -> Result<Column, ColumnNotFound> {
    WaveformTable::new(plot).column(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::plot::{Metadata, SampleMatrix, Variable};
    use ndarray::array;

    fn ac_plot() -> Plot {
        let variables = ["frequency", "v(vout)"]
            .iter()
            .enumerate()
            .map(|(ordinal, name)| Variable {
                name: name.to_string(),
                unit: "voltage".to_string(),
                ordinal,
            })
            .collect();
        Plot::new(
            Metadata::new(),
            variables,
            SampleMatrix::Complex(array![
                [Complex64::new(1.0, 0.0), Complex64::new(2.0, 1.0)],
                [Complex64::new(10.0, 0.0), Complex64::new(0.5, -0.5)],
            ]),
        )
    }

    #[test]
    fn test_column_by_name() {
        let plot = ac_plot();
        let table = WaveformTable::new(&plot);

        assert_eq!(table.len(), 2);
        assert_eq!(table.kind(), ElementKind::Complex);
        assert_eq!(table.real_column("frequency").unwrap(), vec![1.0, 10.0]);
        assert_eq!(
            column(&plot, "v(vout)").unwrap(),
            Column::Complex(vec![Complex64::new(2.0, 1.0), Complex64::new(0.5, -0.5)])
        );
    }

    #[test]
    fn test_missing_column_lists_available_names() {
        let plot = ac_plot();
        let err = column(&plot, "V(VOUT)").unwrap_err();

        assert_eq!(err.requested, "V(VOUT)");
        assert_eq!(err.available, vec!["frequency", "v(vout)"]);
        assert!(err.to_string().contains("frequency, v(vout)"));
    }
}
