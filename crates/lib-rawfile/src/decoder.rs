//! Binary raw-result file decoder.
//!
//! A raw file is a sequence of plots. Each plot is a run of ASCII header
//! lines of the form `Keyword: value`, a `Variables:` section of exactly
//! `No. Variables` definition lines, and a `Binary:` marker followed by
//! `No. Points × No. Variables` little-endian doubles (two per cell for
//! complex plots) and one terminator byte:
//!
//! ```text
//! Title: ota testbench
//! Plotname: AC Analysis
//! Flags: complex
//! No. Variables: 2
//! No. Points: 51
//! Variables:
//! 	0	frequency	frequency grid=3
//! 	1	v(vout)	voltage
//! Binary:
//! <51 × 2 × 16 bytes>\n
//! ```
//!
//! Decoding ends cleanly at the first header line that does not split into
//! a keyword and a value on its first colon, which includes end of input.

use crate::cursor::{ByteCursor, LINE_LIMIT};
use crate::error::{DecodeError, DecodeResult};
use crate::names::VariableNameResolver;
use lib_types::{
    plot::{keywords, ElementKind, Metadata, Plot, SampleMatrix, Variable},
    Complex64,
};
use ndarray::Array2;
use std::io::Read;
use std::path::Path;

/// Decode every plot in an in-memory raw file.
pub fn decode(data: &[u8]) -> DecodeResult<Vec<Plot>> {
    RawFileDecoder::new(data).decode()
}

/// Decode every plot from a byte stream.
pub fn decode_reader<R: Read>(mut reader: R) -> DecodeResult<Vec<Plot>> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    decode(&data)
}

/// Decode every plot in a raw file on disk.
pub fn decode_file(path: &Path) -> DecodeResult<Vec<Plot>> {
    tracing::info!("Decoding raw file: {:?}", path);
    let file = std::fs::File::open(path)?;
    let plots = decode_reader(std::io::BufReader::new(file))?;
    tracing::info!("Decoded {} plot(s) from {:?}", plots.len(), path);
    Ok(plots)
}

/// Per-plot accumulator filled while header lines are read.
#[derive(Debug, Default)]
struct PlotBuilder {
    metadata: Metadata,
    variables: Option<Vec<Variable>>,
    num_points: usize,
}

/// Decoder state between header lines.
#[derive(Debug)]
enum State {
    /// Reading header lines into the current plot.
    AccumulatingMetadata(PlotBuilder),
    /// The binary payload of the current plot has been consumed.
    PlotComplete(Plot),
}

/// Single-session raw file decoder.
///
/// Owns the name resolver for the session, so collision suffixes keep
/// counting across every plot in the file.
pub struct RawFileDecoder<'a> {
    cursor: ByteCursor<'a>,
    names: VariableNameResolver,
}

impl<'a> RawFileDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: ByteCursor::new(data),
            names: VariableNameResolver::new(),
        }
    }

    /// Run the session to completion.
    pub fn decode(mut self) -> DecodeResult<Vec<Plot>> {
        let mut plots = Vec::new();
        let mut state = State::AccumulatingMetadata(PlotBuilder::default());

        loop {
            state = match state {
                State::PlotComplete(plot) => {
                    tracing::debug!(
                        "Plot {}: '{}' with {} variables × {} points ({:?})",
                        plots.len(),
                        plot.plotname().unwrap_or(""),
                        plot.num_variables(),
                        plot.num_points(),
                        plot.samples.kind()
                    );
                    plots.push(plot);
                    State::AccumulatingMetadata(PlotBuilder::default())
                }
                State::AccumulatingMetadata(builder) => match self.step(builder, plots.len())? {
                    Some(next) => next,
                    None => break,
                },
            };
        }

        if !self.cursor.is_eof() {
            tracing::warn!(
                "Stopped decoding with {} unread bytes after plot {}",
                self.cursor.remaining(),
                plots.len()
            );
        }

        Ok(plots)
    }

    /// Consume one header line. Returns `None` at the end-of-stream signal.
    fn step(&mut self, mut builder: PlotBuilder, plot: usize) -> DecodeResult<Option<State>> {
        let line = self.cursor.read_line(LINE_LIMIT)?;
        let Some((keyword, value)) = split_header(line) else {
            if !builder.metadata.is_empty() {
                tracing::warn!(
                    "Discarding {} header keyword(s) of an incomplete plot {}",
                    builder.metadata.len(),
                    plot
                );
            }
            return Ok(None);
        };

        let section = keyword.clone();
        builder.metadata.insert(keyword, value);

        let next = match section.as_str() {
            keywords::VARIABLES => {
                self.read_variables(&mut builder, plot)?;
                State::AccumulatingMetadata(builder)
            }
            keywords::BINARY => State::PlotComplete(self.read_binary(builder, plot)?),
            _ => State::AccumulatingMetadata(builder),
        };
        Ok(Some(next))
    }

    fn read_variables(&mut self, builder: &mut PlotBuilder, plot: usize) -> DecodeResult<()> {
        let num_vars = declared_count(&builder.metadata, keywords::NO_VARIABLES, plot)?;
        let num_points = declared_count(&builder.metadata, keywords::NO_POINTS, plot)?;

        let mut variables = Vec::new();
        for ordinal in 0..num_vars {
            let line = self.cursor.read_line(LINE_LIMIT)?;
            let text = String::from_utf8_lossy(line);
            let tokens: Vec<&str> = text.split_whitespace().collect();

            if tokens.len() < 3 {
                return Err(DecodeError::MalformedVariable {
                    line: self.cursor.lines_read(),
                    text: text.trim().to_string(),
                });
            }
            if tokens[0].parse::<usize>().ok() != Some(ordinal) {
                return Err(DecodeError::OrdinalMismatch {
                    line: self.cursor.lines_read(),
                    expected: ordinal,
                    found: tokens[0].to_string(),
                });
            }

            variables.push(Variable {
                name: self.names.resolve(tokens[1]),
                unit: tokens[2].to_string(),
                ordinal,
            });
        }

        builder.variables = Some(variables);
        builder.num_points = num_points;
        Ok(())
    }

    fn read_binary(&mut self, mut builder: PlotBuilder, plot: usize) -> DecodeResult<Plot> {
        let flags = builder
            .metadata
            .get(keywords::FLAGS)
            .ok_or_else(|| DecodeError::missing_keyword(plot, keywords::FLAGS, keywords::BINARY))?;
        let kind = ElementKind::from_flags(flags);

        let variables = builder.variables.take().ok_or(DecodeError::MissingSection {
            plot,
            name: keywords::VARIABLES,
            section: keywords::BINARY,
        })?;
        let num_vars = variables.len();
        let num_points = builder.num_points;

        let expected = num_points
            .checked_mul(num_vars)
            .and_then(|cells| cells.checked_mul(kind.width()))
            // ndarray caps every axis at isize::MAX, even alongside a zero-length one.
            .filter(|_| num_points <= isize::MAX as usize && num_vars <= isize::MAX as usize)
            .ok_or(DecodeError::Oversized {
                plot,
                points: num_points,
                variables: num_vars,
            })?;

        let available = self.cursor.remaining();
        let block = self.cursor.read_exact(expected).ok_or(DecodeError::TruncatedBinary {
            plot,
            expected,
            available,
        })?;

        let samples = decode_block(block, num_points, num_vars, kind);

        // One line terminator follows the block.
        self.cursor.skip_byte();

        Ok(Plot::new(builder.metadata, variables, samples))
    }
}

/// Split a header line on its first colon into a lower-cased keyword and a
/// trimmed value.
fn split_header(line: &[u8]) -> Option<(String, String)> {
    let colon = line.iter().position(|&b| b == b':')?;
    let keyword = String::from_utf8_lossy(&line[..colon]).trim().to_lowercase();
    let value = String::from_utf8_lossy(&line[colon + 1..]).trim().to_string();
    Some((keyword, value))
}

fn declared_count(metadata: &Metadata, keyword: &'static str, plot: usize) -> DecodeResult<usize> {
    let value = metadata
        .get(keyword)
        .ok_or_else(|| DecodeError::missing_keyword(plot, keyword, keywords::VARIABLES))?;
    value
        .parse()
        .map_err(|e| DecodeError::invalid_value(keyword, value.as_str(), format!("{}", e)))
}

/// Decode a validated block into a row-major matrix.
fn decode_block(block: &[u8], rows: usize, cols: usize, kind: ElementKind) -> SampleMatrix {
    match kind {
        ElementKind::Real => SampleMatrix::Real(Array2::from_shape_fn((rows, cols), |(r, c)| {
            read_f64_le(&block[(r * cols + c) * 8..])
        })),
        ElementKind::Complex => {
            SampleMatrix::Complex(Array2::from_shape_fn((rows, cols), |(r, c)| {
                let offset = (r * cols + c) * 16;
                Complex64::new(
                    read_f64_le(&block[offset..]),
                    read_f64_le(&block[offset + 8..]),
                )
            }))
        }
    }
}

/// Read a little-endian f64 from the first 8 bytes.
#[inline]
fn read_f64_le(bytes: &[u8]) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    f64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::encode_plots;
    use ndarray::array;

    fn header(lines: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for line in lines {
            out.extend_from_slice(line.as_bytes());
            out.push(b'\n');
        }
        out
    }

    fn push_reals(out: &mut Vec<u8>, values: &[f64]) {
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    fn real_plot(title: &str, names: &[&str], rows: Array2<f64>) -> Plot {
        let mut metadata = Metadata::new();
        metadata.insert(keywords::TITLE.to_string(), title.to_string());
        metadata.insert(keywords::PLOTNAME.to_string(), "DC transfer characteristic".to_string());
        metadata.insert(keywords::FLAGS.to_string(), "real".to_string());
        metadata.insert(keywords::NO_VARIABLES.to_string(), names.len().to_string());
        metadata.insert(keywords::NO_POINTS.to_string(), rows.nrows().to_string());
        let variables = names
            .iter()
            .enumerate()
            .map(|(ordinal, name)| Variable {
                name: name.to_string(),
                unit: "voltage".to_string(),
                ordinal,
            })
            .collect();
        Plot::new(metadata, variables, SampleMatrix::Real(rows))
    }

    #[test]
    fn test_empty_input_has_no_plots() {
        assert!(decode(b"").unwrap().is_empty());
    }

    #[test]
    fn test_decode_real_plot() {
        let mut data = header(&[
            "Title: divider",
            "Date: Thu Jan  1 00:00:00 2026",
            "Plotname: DC transfer characteristic",
            "Flags: real",
            "No. Variables: 2",
            "No. Points: 3",
            "Variables:",
            "\t0\tv-sweep\tvoltage",
            "\t1\tv(out)\tvoltage\textra tokens",
            "Binary:",
        ]);
        push_reals(&mut data, &[0.0, 0.0, 1.0, 0.5, 2.0, 1.0]);
        data.push(b'\n');

        let plots = decode(&data).unwrap();
        assert_eq!(plots.len(), 1);

        let plot = &plots[0];
        assert_eq!(plot.title(), Some("divider"));
        // Values are trimmed but inner whitespace is preserved.
        assert_eq!(plot.get("date"), Some("Thu Jan  1 00:00:00 2026"));
        assert_eq!(plot.num_variables(), 2);
        assert_eq!(plot.num_points(), 3);
        assert_eq!(plot.variables[1].name, "v(out)");
        assert_eq!(plot.variables[1].unit, "voltage");
        assert_eq!(plot.variables[1].ordinal, 1);
        assert_eq!(
            plot.samples,
            SampleMatrix::Real(array![[0.0, 0.0], [1.0, 0.5], [2.0, 1.0]])
        );

        // Metadata keeps insertion order, including the section markers.
        let keys: Vec<&str> = plot.metadata.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["title", "date", "plotname", "flags", "no. variables", "no. points", "variables", "binary"]
        );
    }

    #[test]
    fn test_decode_complex_plot() {
        let mut data = header(&[
            "Title: ota",
            "Plotname: AC Analysis",
            "Flags: complex",
            "No. Variables: 2",
            "No. Points: 2",
            "Variables:",
            "\t0\tfrequency\tfrequency\tgrid=3",
            "\t1\tv(vout)\tvoltage",
            "Binary:",
        ]);
        push_reals(&mut data, &[1.0, 0.0, 10.0, -1.0, 10.0, 0.0, 5.0, -5.0]);
        data.push(b'\n');

        let plots = decode(&data).unwrap();
        let plot = &plots[0];
        assert!(plot.is_complex());
        assert_eq!(
            plot.samples,
            SampleMatrix::Complex(array![
                [Complex64::new(1.0, 0.0), Complex64::new(10.0, -1.0)],
                [Complex64::new(10.0, 0.0), Complex64::new(5.0, -5.0)],
            ])
        );
    }

    #[test]
    fn test_round_trip_is_bit_exact() {
        let rows = array![
            [0.0, -0.0, f64::MIN_POSITIVE],
            [1e-300, 1.0 / 3.0, -2.5e12],
            [f64::MAX, 7.0, -1.0],
        ];
        let original = real_plot("bits", &["time", "v(a)", "i(vdd)"], rows);

        let plots = decode(&encode_plots(std::slice::from_ref(&original))).unwrap();
        assert_eq!(plots.len(), 1);
        assert_eq!(plots[0].variables, original.variables);

        let (SampleMatrix::Real(decoded), SampleMatrix::Real(expected)) =
            (&plots[0].samples, &original.samples)
        else {
            panic!("expected real samples");
        };
        for (a, b) in decoded.iter().zip(expected.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_collision_counter_spans_plots() {
        let first = real_plot("one", &["net1", "net1", "v(x)"], array![[1.0, 2.0, 3.0]]);
        let second = real_plot("two", &["net1", "v(y)"], array![[4.0, 5.0]]);

        let plots = decode(&encode_plots(&[first, second])).unwrap();
        assert_eq!(plots.len(), 2);

        let names: Vec<&str> = plots[0].variable_names().collect();
        assert_eq!(names, vec!["net1", "net10", "v(x)"]);

        // The counter continues rather than restarting for the second plot.
        let names: Vec<&str> = plots[1].variable_names().collect();
        assert_eq!(names, vec!["net11", "v(y)"]);

        // Per-plot metadata does not leak between plots.
        assert_eq!(plots[1].title(), Some("two"));
        assert_eq!(plots[1].get(keywords::NO_VARIABLES), Some("2"));
    }

    #[test]
    fn test_declared_counts_match_decoded_shape() {
        let plots = vec![
            real_plot("a", &["x"], array![[1.0], [2.0], [3.0], [4.0]]),
            real_plot("b", &["x", "y", "z"], Array2::zeros((0, 3))),
        ];
        for plot in decode(&encode_plots(&plots)).unwrap() {
            let declared_vars: usize = plot.get(keywords::NO_VARIABLES).unwrap().parse().unwrap();
            let declared_points: usize = plot.get(keywords::NO_POINTS).unwrap().parse().unwrap();
            assert_eq!(plot.num_variables(), declared_vars);
            assert_eq!(plot.num_points(), declared_points);
        }
    }

    #[test]
    fn test_truncated_binary_block() {
        let mut data = header(&[
            "Flags: real",
            "No. Variables: 1",
            "No. Points: 4",
            "Variables:",
            "0 v(a) voltage",
            "Binary:",
        ]);
        push_reals(&mut data, &[1.0, 2.0, 3.0]);

        match decode(&data) {
            Err(DecodeError::TruncatedBinary { plot: 0, expected: 32, available: 24 }) => {}
            other => panic!("expected truncated binary error, got {:?}", other),
        }
    }

    #[test]
    fn test_variables_require_counts() {
        let data = header(&["Flags: real", "No. Variables: 1", "Variables:", "0 v(a) voltage"]);
        match decode(&data) {
            Err(DecodeError::MissingKeyword { keyword, section, .. }) => {
                assert_eq!(keyword, keywords::NO_POINTS);
                assert_eq!(section, keywords::VARIABLES);
            }
            other => panic!("expected missing keyword error, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_requires_flags() {
        let mut data = header(&[
            "No. Variables: 1",
            "No. Points: 1",
            "Variables:",
            "0 v(a) voltage",
            "Binary:",
        ]);
        push_reals(&mut data, &[1.0]);

        match decode(&data) {
            Err(DecodeError::MissingKeyword { keyword, .. }) => assert_eq!(keyword, keywords::FLAGS),
            other => panic!("expected missing flags error, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_requires_variables_section() {
        let data = header(&["Flags: real", "No. Variables: 1", "No. Points: 1", "Binary:"]);
        assert!(matches!(
            decode(&data),
            Err(DecodeError::MissingSection { name: "variables", .. })
        ));
    }

    #[test]
    fn test_ordinal_mismatch() {
        let data = header(&[
            "Flags: real",
            "No. Variables: 2",
            "No. Points: 1",
            "Variables:",
            "0 a voltage",
            "2 b voltage",
        ]);
        match decode(&data) {
            Err(DecodeError::OrdinalMismatch { expected, found, line }) => {
                assert_eq!(expected, 1);
                assert_eq!(found, "2");
                assert_eq!(line, 6);
            }
            other => panic!("expected ordinal mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_short_variable_line() {
        let data = header(&["No. Variables: 1", "No. Points: 1", "Variables:", "0 lonely"]);
        assert!(matches!(decode(&data), Err(DecodeError::MalformedVariable { .. })));
    }

    #[test]
    fn test_invalid_count() {
        let data = header(&["No. Variables: two", "No. Points: 1", "Variables:"]);
        match decode(&data) {
            Err(DecodeError::InvalidValue { keyword, value, .. }) => {
                assert_eq!(keyword, keywords::NO_VARIABLES);
                assert_eq!(value, "two");
            }
            other => panic!("expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_huge_variable_count_is_an_error() {
        let data = b"Flags: real\nNo. Variables: 18446744073709551615\nNo. Points: 1\nVariables:\n0 a voltage\n";
        assert!(matches!(decode(data), Err(DecodeError::MalformedVariable { .. })));
    }

    #[test]
    fn test_huge_point_count_is_oversized() {
        let data = b"Flags: real\nNo. Variables: 0\nNo. Points: 18446744073709551615\nVariables:\nBinary:\n";
        match decode(data) {
            Err(DecodeError::Oversized { points, variables, .. }) => {
                assert_eq!(points, usize::MAX);
                assert_eq!(variables, 0);
            }
            other => panic!("expected oversized plot, got {:?}", other),
        }
    }

    #[test]
    fn test_line_without_colon_ends_stream() {
        let plot = real_plot("only", &["x"], array![[9.0]]);
        let mut data = encode_plots(&[plot]);
        data.extend_from_slice(b"this line has no separator\nTitle: ignored\n");

        let plots = decode(&data).unwrap();
        assert_eq!(plots.len(), 1);
        assert_eq!(plots[0].title(), Some("only"));
    }

    #[test]
    fn test_repeated_keyword_overwrites_in_place() {
        let mut data = header(&[
            "Title: first",
            "Flags: real",
            "Title: second",
            "No. Variables: 1",
            "No. Points: 1",
            "Variables:",
            "0 x voltage",
            "Binary:",
        ]);
        push_reals(&mut data, &[1.0]);

        let plots = decode(&data).unwrap();
        assert_eq!(plots[0].title(), Some("second"));
        assert_eq!(plots[0].metadata.get_index_of(keywords::TITLE), Some(0));
    }

    #[test]
    fn test_missing_terminator_at_end_is_tolerated() {
        let mut data = header(&[
            "Flags: real",
            "No. Variables: 1",
            "No. Points: 2",
            "Variables:",
            "0 x voltage",
            "Binary:",
        ]);
        push_reals(&mut data, &[1.0, 2.0]);

        let plots = decode(&data).unwrap();
        assert_eq!(plots[0].samples, SampleMatrix::Real(array![[1.0], [2.0]]));
    }

    #[test]
    fn test_overlong_header_line() {
        let mut data = b"Title: ".to_vec();
        data.extend(std::iter::repeat(b'x').take(LINE_LIMIT));
        data.push(b'\n');
        assert!(matches!(decode(&data), Err(DecodeError::LineTooLong { line: 1, .. })));
    }

    #[test]
    fn test_decode_reader_propagates_io_errors() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"))
            }
        }
        assert!(matches!(decode_reader(Failing), Err(DecodeError::Io(_))));
    }
}
