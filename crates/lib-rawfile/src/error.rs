//! Error types for raw-file decoding and column lookup.

use thiserror::Error;

/// Errors that can occur while decoding a raw-result file.
///
/// Any of these aborts the whole decode call; plots completed earlier in the
/// same file are not returned.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// I/O error reading the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A header or variable line ran past the line-length cap.
    #[error("Line {line} exceeds the {limit}-byte line limit")]
    LineTooLong { line: usize, limit: usize },

    /// A keyword a section depends on was not recorded first.
    #[error("Plot {plot}: missing required keyword '{keyword}' before '{section}'")]
    MissingKeyword {
        plot: usize,
        keyword: &'static str,
        section: &'static str,
    },

    /// A section a later section depends on was not read first.
    #[error("Plot {plot}: missing required section '{name}' before '{section}'")]
    MissingSection {
        plot: usize,
        name: &'static str,
        section: &'static str,
    },

    /// A keyword value could not be interpreted.
    #[error("Invalid value for '{keyword}': '{value}' ({message})")]
    InvalidValue {
        keyword: String,
        value: String,
        message: String,
    },

    /// A variable-definition line is not `<ordinal> <name> <unit> ...`.
    #[error("Line {line}: malformed variable definition '{text}'")]
    MalformedVariable { line: usize, text: String },

    /// A variable-definition line carries the wrong ordinal.
    #[error("Line {line}: expected variable ordinal {expected}, found {found}")]
    OrdinalMismatch {
        line: usize,
        expected: usize,
        found: String,
    },

    /// The binary block ends before the declared sample count.
    #[error("Plot {plot}: binary block truncated, expected {expected} bytes but only {available} remain")]
    TruncatedBinary {
        plot: usize,
        expected: usize,
        available: usize,
    },

    /// Declared dimensions overflow the addressable byte count.
    #[error("Plot {plot}: {points} points × {variables} variables is too large to decode")]
    Oversized {
        plot: usize,
        points: usize,
        variables: usize,
    },
}

impl DecodeError {
    /// Create a missing keyword error.
    pub fn missing_keyword(plot: usize, keyword: &'static str, section: &'static str) -> Self {
        Self::MissingKeyword { plot, keyword, section }
    }

    /// Create an invalid value error.
    pub fn invalid_value(
        keyword: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            keyword: keyword.into(),
            value: value.into(),
            message: message.into(),
        }
    }
}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// A requested column does not exist in the plot.
///
/// The message lists every available name so tooling can self-diagnose.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Could not find name '{requested}' in columns: {}", .available.join(", "))]
pub struct ColumnNotFound {
    pub requested: String,
    pub available: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_not_found_lists_names() {
        let err = ColumnNotFound {
            requested: "v(out)".to_string(),
            available: vec!["frequency".to_string(), "v(vout)".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Could not find name 'v(out)' in columns: frequency, v(vout)"
        );
    }

    #[test]
    fn test_missing_keyword_message() {
        let err = DecodeError::missing_keyword(0, "flags", "binary");
        assert_eq!(
            err.to_string(),
            "Plot 0: missing required keyword 'flags' before 'binary'"
        );
    }
}
