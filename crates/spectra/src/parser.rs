//! Parser collaborator interface and the built-in text-format implementation.

use std::collections::HashMap;

use tracing::debug;

use crate::error::ParseError;
use crate::format::SpectrumFormat;
use crate::types::{Peak, Spectrum, MISSING_PRECURSOR_MESSAGE};
use crate::{json, mgf, msp, mzml};

/// Turns an uploaded file into an ordered list of spectra.
///
/// Implementations must either return at least one spectrum or an error; the
/// annotation pipeline never sees an empty list from a successful parse.
pub trait SpectrumParser: Send + Sync {
    fn parse(&self, file_name: &str, bytes: &[u8]) -> Result<Vec<Spectrum>, ParseError>;
}

/// In-memory parser for mzML and the MGF, MSP and JSON text formats.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSpectrumParser;

impl SpectrumParser for TextSpectrumParser {
    fn parse(&self, file_name: &str, bytes: &[u8]) -> Result<Vec<Spectrum>, ParseError> {
        let format = SpectrumFormat::from_file_name(file_name)?;
        if bytes.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        let spectra = match format {
            // XML declares its own encoding; mzdata reads the bytes directly.
            SpectrumFormat::MzMl => mzml::parse(bytes)?,
            SpectrumFormat::Mgf => mgf::parse(utf8_text(format, bytes)?)?,
            SpectrumFormat::Msp => msp::parse(utf8_text(format, bytes)?)?,
            SpectrumFormat::Json => json::parse(utf8_text(format, bytes)?)?,
        };

        if spectra.is_empty() {
            return Err(ParseError::NoSpectra);
        }
        debug!(
            file_name,
            format = %format,
            spectra = spectra.len(),
            "parsed spectrum upload"
        );
        Ok(spectra)
    }
}

/// Decode a text-format upload, dropping a leading byte-order mark.
fn utf8_text(format: SpectrumFormat, bytes: &[u8]) -> Result<&str, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8 { format })?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

/// Header keys tried, in order, for each spectrum field.
const ID_KEYS: &[&str] = &["spectrum_id", "id", "scans", "title"];
const PRECURSOR_KEYS: &[&str] = &["precursor_mz", "precursor mz", "precursormz", "pepmass"];
const ADDUCT_KEYS: &[&str] = &["adduct", "precursor_type", "precursor type"];
const FORMULA_KEYS: &[&str] = &["formula", "molecular_formula"];

/// Header block collected by the format readers. Keys are stored lower-cased.
#[derive(Debug, Default)]
pub(crate) struct Headers {
    values: HashMap<String, String>,
}

impl Headers {
    pub(crate) fn insert(&mut self, key: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        self.values
            .entry(key.trim().to_ascii_lowercase())
            .or_insert_with(|| value.to_string());
    }

    fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.values.get(*key))
            .map(String::as_str)
    }

    fn precursor_mz(&self) -> Option<f64> {
        PRECURSOR_KEYS.iter().find_map(|key| {
            let raw = self.values.get(*key)?;
            // PEPMASS may carry an intensity after the m/z.
            let first = raw.split_whitespace().next()?;
            first
                .parse::<f64>()
                .ok()
                .filter(|mz| mz.is_finite() && *mz > 0.0)
        })
    }

    /// Build the final spectrum. `index` is the zero-based position in the file
    /// and is used as the id of last resort.
    pub(crate) fn into_spectrum(self, index: usize, peaks: Vec<Peak>) -> Spectrum {
        let spectrum_id = self
            .first_of(ID_KEYS)
            .map(str::to_string)
            .unwrap_or_else(|| index.to_string());
        let precursor_mz = self.precursor_mz();
        Spectrum {
            spectrum_id,
            precursor_mz,
            peaks,
            adduct: self.first_of(ADDUCT_KEYS).map(str::to_string),
            formula: self.first_of(FORMULA_KEYS).map(str::to_string),
            parsing_message: precursor_mz
                .is_none()
                .then(|| MISSING_PRECURSOR_MESSAGE.to_string()),
        }
    }
}

/// Parse one numeric token of a peak line.
pub(crate) fn parse_number(
    format: SpectrumFormat,
    line_no: usize,
    token: &str,
) -> Result<f64, ParseError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| {
            ParseError::malformed(format, format!("line {line_no}: invalid number {token:?}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_falls_back_through_keys_then_index() {
        let mut headers = Headers::default();
        headers.insert("TITLE", "scan title");
        headers.insert("SCANS", "42");
        let spectrum = headers.into_spectrum(7, Vec::new());
        assert_eq!(spectrum.spectrum_id, "42");

        let spectrum = Headers::default().into_spectrum(7, Vec::new());
        assert_eq!(spectrum.spectrum_id, "7");
    }

    #[test]
    fn pepmass_with_intensity_uses_first_token() {
        let mut headers = Headers::default();
        headers.insert("PEPMASS", "445.12 1200.5");
        assert_eq!(headers.precursor_mz(), Some(445.12));
    }

    #[test]
    fn non_positive_precursor_is_missing() {
        let mut headers = Headers::default();
        headers.insert("PRECURSOR_MZ", "0");
        let spectrum = headers.into_spectrum(0, Vec::new());
        assert_eq!(spectrum.precursor_mz, None);
        assert_eq!(
            spectrum.parsing_message.as_deref(),
            Some(MISSING_PRECURSOR_MESSAGE)
        );
    }

    #[test]
    fn unparsable_precursor_falls_through_to_next_key() {
        let mut headers = Headers::default();
        headers.insert("precursor_mz", "n/a");
        headers.insert("pepmass", "300.5");
        assert_eq!(headers.precursor_mz(), Some(300.5));
    }

    #[test]
    fn first_header_occurrence_wins() {
        let mut headers = Headers::default();
        headers.insert("ADDUCT", "[M+H]+");
        headers.insert("adduct", "[M+Na]+");
        let spectrum = headers.into_spectrum(0, Vec::new());
        assert_eq!(spectrum.adduct.as_deref(), Some("[M+H]+"));
    }

    #[test]
    fn text_parser_rejects_empty_and_unsupported() {
        let parser = TextSpectrumParser;
        assert_eq!(
            parser.parse("a.mgf", b""),
            Err(ParseError::EmptyInput)
        );
        assert!(matches!(
            parser.parse("a.mzXML", b"<mzXML/>"),
            Err(ParseError::UnsupportedFormat(_))
        ));
        assert_eq!(parser.parse("a.mzML", b""), Err(ParseError::EmptyInput));
    }

    #[test]
    fn text_parser_rejects_invalid_utf8() {
        let parser = TextSpectrumParser;
        assert_eq!(
            parser.parse("a.msp", &[0xff, 0xfe, 0x00]),
            Err(ParseError::InvalidUtf8 {
                format: SpectrumFormat::Msp
            })
        );
    }

    #[test]
    fn text_parser_reports_no_spectra() {
        let parser = TextSpectrumParser;
        assert_eq!(
            parser.parse("a.mgf", b"# just a comment\n"),
            Err(ParseError::NoSpectra)
        );
    }
}
