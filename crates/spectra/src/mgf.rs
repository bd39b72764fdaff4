//! Mascot Generic Format reader.
//!
//! ```text
//! BEGIN IONS
//! TITLE=caffeine
//! PEPMASS=195.0877
//! 110.0713 1000
//! 138.0662 3800
//! END IONS
//! ```

use crate::error::ParseError;
use crate::format::SpectrumFormat;
use crate::parser::{parse_number, Headers};
use crate::types::{Peak, Spectrum};

const FORMAT: SpectrumFormat = SpectrumFormat::Mgf;

pub(crate) fn parse(text: &str) -> Result<Vec<Spectrum>, ParseError> {
    let mut spectra = Vec::new();
    let mut block: Option<(Headers, Vec<Peak>)> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(['#', ';', '!']) {
            continue;
        }

        if line.eq_ignore_ascii_case("BEGIN IONS") {
            if block.is_some() {
                return Err(ParseError::malformed(
                    FORMAT,
                    format!("line {line_no}: BEGIN IONS inside an open block"),
                ));
            }
            block = Some((Headers::default(), Vec::new()));
            continue;
        }

        if line.eq_ignore_ascii_case("END IONS") {
            let (headers, peaks) = block.take().ok_or_else(|| {
                ParseError::malformed(FORMAT, format!("line {line_no}: END IONS without BEGIN IONS"))
            })?;
            spectra.push(headers.into_spectrum(spectra.len(), peaks));
            continue;
        }

        let Some((headers, peaks)) = block.as_mut() else {
            // Global parameters before the first block (e.g. `COM=`) are ignored.
            if line.contains('=') {
                continue;
            }
            return Err(ParseError::malformed(
                FORMAT,
                format!("line {line_no}: data outside of a BEGIN IONS block"),
            ));
        };

        if let Some((key, value)) = line.split_once('=') {
            headers.insert(key, value);
            continue;
        }

        let mut tokens = line.split_whitespace();
        let (Some(mz), Some(intensity)) = (tokens.next(), tokens.next()) else {
            return Err(ParseError::malformed(
                FORMAT,
                format!("line {line_no}: expected `mz intensity`"),
            ));
        };
        peaks.push(Peak::new(
            parse_number(FORMAT, line_no, mz)?,
            parse_number(FORMAT, line_no, intensity)?,
        ));
    }

    if block.is_some() {
        return Err(ParseError::malformed(
            FORMAT,
            "unterminated BEGIN IONS block at end of file",
        ));
    }
    Ok(spectra)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SPECTRA: &str = "\
COM=exported by test
BEGIN IONS
TITLE=no precursor
SCANS=17
50.0 10
60.5 20.5
END IONS

BEGIN IONS
TITLE=caffeine
PEPMASS=195.0877 5000
ADDUCT=[M+H]+
FORMULA=C8H10N4O2
110.0713 1000
138.0662\t3800 1+
END IONS
";

    #[test]
    fn parses_blocks_in_file_order() {
        let spectra = parse(TWO_SPECTRA).unwrap();
        assert_eq!(spectra.len(), 2);

        assert_eq!(spectra[0].spectrum_id, "17");
        assert_eq!(spectra[0].precursor_mz, None);
        assert!(spectra[0].parsing_message.is_some());
        assert_eq!(spectra[0].peaks, vec![Peak::new(50.0, 10.0), Peak::new(60.5, 20.5)]);

        assert_eq!(spectra[1].spectrum_id, "caffeine");
        assert_eq!(spectra[1].precursor_mz, Some(195.0877));
        assert_eq!(spectra[1].adduct.as_deref(), Some("[M+H]+"));
        assert_eq!(spectra[1].formula.as_deref(), Some("C8H10N4O2"));
        assert_eq!(spectra[1].peaks.len(), 2);
        assert_eq!(spectra[1].peaks[1], Peak::new(138.0662, 3800.0));
    }

    #[test]
    fn block_without_id_uses_index() {
        let spectra = parse("BEGIN IONS\nPEPMASS=100\nEND IONS\nBEGIN IONS\nEND IONS\n").unwrap();
        assert_eq!(spectra[0].spectrum_id, "0");
        assert_eq!(spectra[1].spectrum_id, "1");
        assert!(spectra[1].peaks.is_empty());
    }

    #[test]
    fn rejects_unterminated_block() {
        let err = parse("BEGIN IONS\nPEPMASS=100\n50 1\n").unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn rejects_bad_peak_line() {
        let err = parse("BEGIN IONS\n50.0 abc\nEND IONS\n").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn rejects_stray_end() {
        assert!(parse("END IONS\n").is_err());
    }
}
