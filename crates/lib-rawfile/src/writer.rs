//! Binary raw-result file writer.
//!
//! Produces the layout [`crate::decoder`] reads: header lines, a variables
//! section, then the little-endian sample block and one terminator byte.
//! The count and flags keywords are always written from the plot's actual
//! shape so the output decodes back to the same matrix.

use lib_types::plot::{keywords, ElementKind, Plot, SampleMatrix};
use std::io::{self, Write};

/// Encode plots into an in-memory raw file.
pub fn encode_plots(plots: &[Plot]) -> Vec<u8> {
    let mut out = Vec::new();
    for plot in plots {
        // Writing into a Vec cannot fail.
        let _ = write_plot(&mut out, plot);
    }
    out
}

/// Write one plot.
pub fn write_plot<W: Write>(writer: &mut W, plot: &Plot) -> io::Result<()> {
    let kind = plot.samples.kind();
    let mut wrote_flags = false;
    let mut wrote_vars = false;
    let mut wrote_points = false;

    for (keyword, value) in &plot.metadata {
        match keyword.as_str() {
            keywords::VARIABLES | keywords::BINARY => continue,
            keywords::FLAGS => {
                wrote_flags = true;
                writeln!(writer, "{}: {}", display_keyword(keyword), flags_for(value, kind))?;
            }
            keywords::NO_VARIABLES => {
                wrote_vars = true;
                writeln!(writer, "{}: {}", display_keyword(keyword), plot.num_variables())?;
            }
            keywords::NO_POINTS => {
                wrote_points = true;
                writeln!(writer, "{}: {}", display_keyword(keyword), plot.num_points())?;
            }
            _ => writeln!(writer, "{}: {}", display_keyword(keyword), value)?,
        }
    }

    if !wrote_flags {
        writeln!(writer, "Flags: {}", flags_for("", kind))?;
    }
    if !wrote_vars {
        writeln!(writer, "No. Variables: {}", plot.num_variables())?;
    }
    if !wrote_points {
        writeln!(writer, "No. Points: {}", plot.num_points())?;
    }

    writeln!(writer, "Variables:")?;
    for var in &plot.variables {
        writeln!(writer, "\t{}\t{}\t{}", var.ordinal, var.name, var.unit)?;
    }

    writeln!(writer, "Binary:")?;
    match &plot.samples {
        SampleMatrix::Real(m) => {
            for v in m.iter() {
                writer.write_all(&v.to_le_bytes())?;
            }
        }
        SampleMatrix::Complex(m) => {
            for c in m.iter() {
                writer.write_all(&c.re.to_le_bytes())?;
                writer.write_all(&c.im.to_le_bytes())?;
            }
        }
    }
    writer.write_all(b"\n")
}

/// Keep the stored flags when they agree with the matrix, otherwise write
/// the bare element kind.
fn flags_for(stored: &str, kind: ElementKind) -> String {
    if !stored.is_empty() && ElementKind::from_flags(stored) == kind {
        return stored.to_string();
    }
    match kind {
        ElementKind::Real => "real".to_string(),
        ElementKind::Complex => keywords::COMPLEX_FLAG.to_string(),
    }
}

/// Conventional capitalisation for a lower-cased keyword.
fn display_keyword(keyword: &str) -> String {
    match keyword {
        keywords::NO_VARIABLES => "No. Variables".to_string(),
        keywords::NO_POINTS => "No. Points".to_string(),
        _ => {
            let mut chars = keyword.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::plot::{Metadata, Variable};
    use lib_types::Complex64;
    use ndarray::array;

    #[test]
    fn test_header_layout() {
        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), "t".to_string());
        metadata.insert("flags".to_string(), "real".to_string());
        let plot = Plot::new(
            metadata,
            vec![Variable { name: "v(a)".to_string(), unit: "voltage".to_string(), ordinal: 0 }],
            SampleMatrix::Real(array![[2.0]]),
        );

        let bytes = encode_plots(&[plot]);
        let text_len = bytes.len() - 8 - 1;
        let text = std::str::from_utf8(&bytes[..text_len]).unwrap();
        assert_eq!(
            text,
            "Title: t\nFlags: real\nNo. Variables: 1\nNo. Points: 1\nVariables:\n\t0\tv(a)\tvoltage\nBinary:\n"
        );
        assert_eq!(&bytes[text_len..text_len + 8], &2.0f64.to_le_bytes());
        assert_eq!(bytes.last(), Some(&b'\n'));
    }

    #[test]
    fn test_flags_follow_matrix_kind() {
        let mut metadata = Metadata::new();
        metadata.insert("flags".to_string(), "real".to_string());
        let plot = Plot::new(
            metadata,
            vec![Variable { name: "x".to_string(), unit: "voltage".to_string(), ordinal: 0 }],
            SampleMatrix::Complex(array![[Complex64::new(1.0, -1.0)]]),
        );

        let bytes = encode_plots(&[plot]);
        assert!(bytes.starts_with(b"Flags: complex\n"));
        // One complex cell is 16 bytes plus the terminator.
        let block_start = bytes.len() - 17;
        assert_eq!(&bytes[block_start..block_start + 8], &1.0f64.to_le_bytes());
    }
}
