//! mzML reader backed by `mzdata`.
//!
//! Only the fields the pipeline needs are lifted out of each scan: the native
//! id, the first selected ion of the first precursor, and the centroid arrays.
//! A scan whose binary arrays cannot be decoded is skipped; the rest of the
//! run is still returned.

use std::io::Cursor;

use mzdata::io::mzml::MzMLReader;
use mzdata::prelude::*;
use tracing::debug;

use crate::error::ParseError;
use crate::format::SpectrumFormat;
use crate::types::{Peak, Spectrum};

/// How far into the file the `<mzML` root (or its `<indexedmzML>` wrapper) is
/// looked for.
const ROOT_SCAN_LIMIT: usize = 64 * 1024;

pub(crate) fn parse(bytes: &[u8]) -> Result<Vec<Spectrum>, ParseError> {
    let head = &bytes[..bytes.len().min(ROOT_SCAN_LIMIT)];
    if !head.windows(b"<mzML".len()).any(|window| window == b"<mzML") {
        return Err(ParseError::malformed(
            SpectrumFormat::MzMl,
            "missing <mzML> root element",
        ));
    }

    let reader: MzMLReader<_> = MzMLReader::new(Cursor::new(bytes));
    let mut spectra = Vec::new();
    for (index, scan) in reader.enumerate() {
        let peaks = match centroid_peaks(&scan) {
            Ok(peaks) => peaks,
            Err(reason) => {
                debug!(index, id = scan.id(), %reason, "skipping undecodable mzML scan");
                continue;
            }
        };

        let spectrum_id = match scan.id() {
            "" => index.to_string(),
            id => id.to_string(),
        };
        let precursor_mz = scan
            .precursor()
            .and_then(|precursor| precursor.ions.first())
            .map(|ion| ion.mz)
            .filter(|mz| mz.is_finite() && *mz > 0.0);

        spectra.push(Spectrum::new(spectrum_id, precursor_mz, peaks));
    }
    Ok(spectra)
}

fn centroid_peaks<S: SpectrumLike>(scan: &S) -> Result<Vec<Peak>, String> {
    let Some(arrays) = scan.raw_arrays() else {
        return Ok(Vec::new());
    };
    let mzs = arrays.mzs().map_err(|err| err.to_string())?;
    let intensities = arrays.intensities().map_err(|err| err.to_string())?;
    if mzs.len() != intensities.len() {
        return Err(format!(
            "{} m/z values but {} intensities",
            mzs.len(),
            intensities.len()
        ));
    }
    Ok(mzs
        .iter()
        .zip(intensities.iter())
        .map(|(&mz, &intensity)| Peak::new(mz, f64::from(intensity)))
        .collect())
}
