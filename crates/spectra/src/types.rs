//! Core data model shared by every pipeline stage.
//!
//! A [`Spectrum`] is produced once by a parser and then only read: the encoder
//! borrows its peaks, the orchestrator borrows its id and precursor mass.
//!
//! ```text
//! Spectrum
//! ├── spectrum_id: String        (unique within one upload)
//! ├── precursor_mz: Option<f64>  (None = candidate search impossible)
//! ├── peaks: Vec<Peak>           (file order, never re-sorted)
//! ├── adduct / formula           (informational)
//! └── parsing_message            (why a field is missing)
//! ```

use serde::{Deserialize, Serialize};

/// Message attached by the parsers when a spectrum carries no usable precursor.
pub const MISSING_PRECURSOR_MESSAGE: &str =
    "Missing precursor_mz in input spectrum. Candidate search is unavailable.";

/// A single centroided peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Peak m/z value.
    pub mz: f64,
    /// Peak intensity.
    pub intensity: f64,
}

impl Peak {
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

/// One MS/MS spectrum normalized from an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    /// Identifier, unique within the source file.
    pub spectrum_id: String,
    /// Precursor m/z. Parsers only ever store positive, finite values here.
    pub precursor_mz: Option<f64>,
    /// Peaks in file order.
    #[serde(default)]
    pub peaks: Vec<Peak>,
    /// Adduct string when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adduct: Option<String>,
    /// Molecular formula when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    /// Explanation for missing fields, surfaced to the caller as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsing_message: Option<String>,
}

impl Spectrum {
    /// Build a spectrum with no optional annotations.
    ///
    /// A missing or unusable precursor gets the standard
    /// [`MISSING_PRECURSOR_MESSAGE`].
    pub fn new(spectrum_id: impl Into<String>, precursor_mz: Option<f64>, peaks: Vec<Peak>) -> Self {
        let mut spectrum = Self {
            spectrum_id: spectrum_id.into(),
            precursor_mz,
            peaks,
            adduct: None,
            formula: None,
            parsing_message: None,
        };
        if !spectrum.has_precursor() {
            spectrum.parsing_message = Some(MISSING_PRECURSOR_MESSAGE.to_string());
        }
        spectrum
    }

    /// Build a spectrum from `(mz, intensity)` tuples.
    pub fn from_pairs(
        spectrum_id: impl Into<String>,
        precursor_mz: Option<f64>,
        pairs: &[(f64, f64)],
    ) -> Self {
        let peaks = pairs.iter().map(|&(mz, i)| Peak::new(mz, i)).collect();
        Self::new(spectrum_id, precursor_mz, peaks)
    }

    /// Whether this spectrum can enter encoding and candidate search.
    ///
    /// Same rule the parsers apply: the precursor must be finite and positive.
    /// Spectra built by hand or deserialized directly can still carry NaN or a
    /// negative mass, and those never reach the mass window.
    pub fn has_precursor(&self) -> bool {
        matches!(self.precursor_mz, Some(mz) if mz.is_finite() && mz > 0.0)
    }

    pub fn num_peaks(&self) -> usize {
        self.peaks.len()
    }
}
