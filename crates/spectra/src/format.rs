//! Supported upload formats and extension detection.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Message returned to clients when an upload has an unknown extension.
pub const SUPPORTED_FORMATS_MESSAGE: &str =
    "Unsupported file format. Use .mzML, .MGF, .MSP or .JSON files.";

/// Closed set of spectrum file formats the built-in parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpectrumFormat {
    /// HUPO-PSI mzML XML, read through `mzdata`.
    #[serde(rename = "mzML")]
    MzMl,
    /// Mascot Generic Format (`BEGIN IONS` blocks).
    #[serde(rename = "MGF")]
    Mgf,
    /// NIST MSP library text format.
    #[serde(rename = "MSP")]
    Msp,
    /// matchms-style JSON array of spectra.
    #[serde(rename = "JSON")]
    Json,
}

impl SpectrumFormat {
    pub const ALL: [SpectrumFormat; 4] = [Self::MzMl, Self::Mgf, Self::Msp, Self::Json];

    /// Lower-case extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::MzMl => ".mzml",
            Self::Mgf => ".mgf",
            Self::Msp => ".msp",
            Self::Json => ".json",
        }
    }

    /// Label echoed back in API responses.
    pub fn label(self) -> &'static str {
        match self {
            Self::MzMl => "mzML",
            Self::Mgf => "MGF",
            Self::Msp => "MSP",
            Self::Json => "JSON",
        }
    }

    /// Detect the format from a file name, case-insensitively.
    pub fn from_file_name(file_name: &str) -> Result<Self, ParseError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();

        Self::ALL
            .into_iter()
            .find(|format| format.extension() == extension)
            .ok_or(ParseError::UnsupportedFormat(extension))
    }
}

impl fmt::Display for SpectrumFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
