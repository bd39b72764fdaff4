//! # CSMP Spectra
//!
//! Data model and upload parsers for the spectrum annotation pipeline.
//!
//! Everything downstream (encoding, candidate search, orchestration) consumes
//! the normalized [`Spectrum`] list produced here and never looks at raw file
//! bytes. Parsing is all-or-nothing: an upload either yields at least one
//! spectrum or a [`ParseError`] that rejects the request.
//!
//! Spectra without a usable precursor m/z are *kept*, with `precursor_mz: None`
//! and an explanatory `parsing_message`, so the caller still gets one result
//! per spectrum in the file.
//!
//! ## Supported formats
//!
//! | Extension | [`SpectrumFormat`] | Notes |
//! |-----------|--------------------|-------|
//! | `.mzml` | `MzMl` | PSI mzML via `mzdata`, first selected ion as precursor |
//! | `.mgf` | `Mgf` | `BEGIN IONS` / `END IONS` blocks, `PEPMASS` precursor |
//! | `.msp` | `Msp` | NIST library records, `PrecursorMZ` precursor |
//! | `.json` | `Json` | matchms / GNPS arrays, `peaks_json` peaks |
//!
//! ## Example
//!
//! ```rust
//! use spectra::{parse_spectra, SpectrumFormat};
//!
//! let mgf = b"BEGIN IONS\nTITLE=s1\nPEPMASS=195.08\n110.07 1000\nEND IONS\n";
//! let spectra = parse_spectra("upload.mgf", mgf).unwrap();
//! assert_eq!(spectra[0].spectrum_id, "s1");
//! assert_eq!(spectra[0].precursor_mz, Some(195.08));
//! assert_eq!(SpectrumFormat::from_file_name("upload.mgf").unwrap().label(), "MGF");
//! ```

pub mod error;
pub mod format;
pub mod parser;
pub mod types;

mod json;
mod mgf;
mod msp;
mod mzml;

pub use crate::error::ParseError;
pub use crate::format::{SpectrumFormat, SUPPORTED_FORMATS_MESSAGE};
pub use crate::parser::{SpectrumParser, TextSpectrumParser};
pub use crate::types::{Peak, Spectrum, MISSING_PRECURSOR_MESSAGE};

/// Parse an upload with the built-in [`TextSpectrumParser`].
pub fn parse_spectra(file_name: &str, bytes: &[u8]) -> Result<Vec<Spectrum>, ParseError> {
    TextSpectrumParser.parse(file_name, bytes)
}
