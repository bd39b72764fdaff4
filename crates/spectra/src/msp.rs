//! NIST MSP library reader.
//!
//! Records are separated by blank lines. Each record is a run of `Key: value`
//! headers terminated by `Num Peaks: N`, followed by the peak list. Peak lines
//! may hold several pairs separated by `;`, and may carry a quoted annotation.

use crate::error::ParseError;
use crate::format::SpectrumFormat;
use crate::parser::{parse_number, Headers};
use crate::types::{Peak, Spectrum};

const FORMAT: SpectrumFormat = SpectrumFormat::Msp;

#[derive(Default)]
struct Record {
    headers: Headers,
    peaks: Vec<Peak>,
    in_peaks: bool,
    touched: bool,
}

pub(crate) fn parse(text: &str) -> Result<Vec<Spectrum>, ParseError> {
    let mut spectra = Vec::new();
    let mut record = Record::default();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();

        if line.is_empty() {
            flush(&mut record, &mut spectra);
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        if record.in_peaks {
            // Some exporters omit the blank separator before the next record.
            if starts_record(line) {
                flush(&mut record, &mut spectra);
            } else {
                parse_peak_line(line, line_no, &mut record.peaks)?;
                continue;
            }
        }

        let Some((key, value)) = line.split_once(':') else {
            return Err(ParseError::malformed(
                FORMAT,
                format!("line {line_no}: expected `Key: value` header"),
            ));
        };
        record.touched = true;
        if key.trim().eq_ignore_ascii_case("num peaks") {
            record.in_peaks = true;
        } else {
            record.headers.insert(key, value);
        }
    }

    flush(&mut record, &mut spectra);
    Ok(spectra)
}

fn starts_record(line: &str) -> bool {
    line.split_once(':')
        .is_some_and(|(key, _)| key.trim().eq_ignore_ascii_case("name"))
}

fn flush(record: &mut Record, spectra: &mut Vec<Spectrum>) {
    let finished = std::mem::take(record);
    if finished.touched {
        spectra.push(finished.headers.into_spectrum(spectra.len(), finished.peaks));
    }
}

fn parse_peak_line(line: &str, line_no: usize, peaks: &mut Vec<Peak>) -> Result<(), ParseError> {
    for chunk in line.split(';') {
        // Drop quoted annotations such as `"p-CH3/-1.2ppm"`.
        let data = chunk.split('"').next().unwrap_or_default();
        let numbers: Vec<&str> = data
            .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
            .filter(|token| !token.is_empty())
            .collect();
        if numbers.is_empty() {
            continue;
        }
        if numbers.len() % 2 != 0 {
            return Err(ParseError::malformed(
                FORMAT,
                format!("line {line_no}: unpaired peak value"),
            ));
        }
        for pair in numbers.chunks_exact(2) {
            peaks.push(Peak::new(
                parse_number(FORMAT, line_no, pair[0])?,
                parse_number(FORMAT, line_no, pair[1])?,
            ));
        }
    }
    Ok(())
}
