//! # lib-rawfile
//!
//! Reader and writer for ngspice binary raw-result files.
//!
//! - [`decode`]: split a file into [`Plot`](lib_types::Plot)s, one per analysis
//! - [`WaveformTable`]: named-column access to a decoded plot
//! - [`encode_plots`]: write plots back out in the same layout
//!
//! Decoding is a single synchronous pass over an in-memory buffer. Variable
//! names that repeat anywhere in a file are renamed with a suffix counter
//! shared by every plot in that file.

pub mod error;
pub mod cursor;
pub mod names;
pub mod decoder;
pub mod table;
pub mod writer;

pub use error::{ColumnNotFound, DecodeError, DecodeResult};
pub use cursor::ByteCursor;
pub use names::VariableNameResolver;
pub use decoder::{decode, decode_file, decode_reader, RawFileDecoder};
pub use table::{column, WaveformTable};
pub use writer::{encode_plots, write_plot};
