//! Error types produced while turning an upload into spectra.
//!
//! Every variant rejects the whole upload: a file either yields a usable,
//! non-empty list of spectra or nothing at all.
//!
//! | Error | HTTP | Description |
//! |-------|------|-------------|
//! | [`UnsupportedFormat`](ParseError::UnsupportedFormat) | 400 | Extension not recognized |
//! | [`EmptyInput`](ParseError::EmptyInput) | 400 | Zero-byte upload |
//! | [`InvalidUtf8`](ParseError::InvalidUtf8) | 400 | Text format with non UTF-8 bytes |
//! | [`Malformed`](ParseError::Malformed) | 400 | Structural error in the file body |
//! | [`NoSpectra`](ParseError::NoSpectra) | 400 | Parsed cleanly but contained nothing |

use thiserror::Error;

use crate::format::SpectrumFormat;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The file extension is not one of [`SpectrumFormat::ALL`].
    #[error("unsupported file extension: {0:?}")]
    UnsupportedFormat(String),
    #[error("Uploaded file is empty.")]
    EmptyInput,
    #[error("{format} file is not valid UTF-8 text")]
    InvalidUtf8 { format: SpectrumFormat },
    #[error("Failed to parse {format} file content: {reason}")]
    Malformed {
        format: SpectrumFormat,
        reason: String,
    },
    #[error("No spectra were parsed from file.")]
    NoSpectra,
}

impl ParseError {
    pub(crate) fn malformed(format: SpectrumFormat, reason: impl Into<String>) -> Self {
        ParseError::Malformed {
            format,
            reason: reason.into(),
        }
    }
}
