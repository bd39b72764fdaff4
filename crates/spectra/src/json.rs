//! matchms / GNPS style JSON reader.
//!
//! Accepts either a top-level array of spectrum objects or a single object.
//! Peaks are read from the first of:
//!
//! - `peaks_json`: `[[mz, intensity], ...]`, or that same array encoded as a string (GNPS)
//! - `peaks`: same shape as `peaks_json`
//! - `mz` + `intensities`: two parallel arrays
//!
//! Every other scalar key becomes a header, so the usual id/precursor/adduct
//! fallbacks apply.

use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::format::SpectrumFormat;
use crate::parser::Headers;
use crate::types::{Peak, Spectrum};

const FORMAT: SpectrumFormat = SpectrumFormat::Json;

pub(crate) fn parse(text: &str) -> Result<Vec<Spectrum>, ParseError> {
    let root: Value = serde_json::from_str(text)
        .map_err(|err| ParseError::malformed(FORMAT, err.to_string()))?;

    let entries = match root {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => {
            return Err(ParseError::malformed(
                FORMAT,
                "expected an array of spectrum objects",
            ))
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Value::Object(map) => parse_entry(index, map),
            _ => Err(ParseError::malformed(
                FORMAT,
                format!("entry {index} is not an object"),
            )),
        })
        .collect()
}

fn parse_entry(index: usize, mut map: Map<String, Value>) -> Result<Spectrum, ParseError> {
    let peaks = take_peaks(index, &mut map)?;

    let mut headers = Headers::default();
    for (key, value) in &map {
        if let Some(text) = scalar_text(value) {
            headers.insert(key, &text);
        }
    }
    Ok(headers.into_spectrum(index, peaks))
}

fn take_peaks(index: usize, map: &mut Map<String, Value>) -> Result<Vec<Peak>, ParseError> {
    for key in ["peaks_json", "peaks"] {
        if let Some(value) = map.remove(key) {
            let value = match value {
                Value::String(encoded) => serde_json::from_str(&encoded).map_err(|err| {
                    ParseError::malformed(FORMAT, format!("entry {index}: {key}: {err}"))
                })?,
                other => other,
            };
            return pairs_to_peaks(index, &value);
        }
    }

    match (map.remove("mz"), map.remove("intensities")) {
        (Some(mz), Some(intensities)) => {
            let mz = number_array(index, "mz", &mz)?;
            let intensities = number_array(index, "intensities", &intensities)?;
            if mz.len() != intensities.len() {
                return Err(ParseError::malformed(
                    FORMAT,
                    format!(
                        "entry {index}: {} mz values but {} intensities",
                        mz.len(),
                        intensities.len()
                    ),
                ));
            }
            Ok(mz
                .into_iter()
                .zip(intensities)
                .map(|(mz, intensity)| Peak::new(mz, intensity))
                .collect())
        }
        (None, None) => Ok(Vec::new()),
        _ => Err(ParseError::malformed(
            FORMAT,
            format!("entry {index}: `mz` and `intensities` must appear together"),
        )),
    }
}

fn pairs_to_peaks(index: usize, value: &Value) -> Result<Vec<Peak>, ParseError> {
    let Value::Array(pairs) = value else {
        return Err(ParseError::malformed(
            FORMAT,
            format!("entry {index}: peaks must be an array"),
        ));
    };
    pairs
        .iter()
        .map(|pair| match number_array(index, "peak", pair)?.as_slice() {
            [mz, intensity] => Ok(Peak::new(*mz, *intensity)),
            _ => Err(ParseError::malformed(
                FORMAT,
                format!("entry {index}: each peak must be a [mz, intensity] pair"),
            )),
        })
        .collect()
}

fn number_array(index: usize, field: &str, value: &Value) -> Result<Vec<f64>, ParseError> {
    let invalid = || ParseError::malformed(FORMAT, format!("entry {index}: invalid {field} array"));
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|item| item.as_f64().filter(|v| v.is_finite()).ok_or_else(invalid))
        .collect()
}

/// Header value for a JSON scalar. Arrays contribute their first element, which
/// covers `"pepmass": [195.08, null]`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => items.first().and_then(scalar_text),
        Value::Bool(_) | Value::Null | Value::Object(_) => None,
    }
}
