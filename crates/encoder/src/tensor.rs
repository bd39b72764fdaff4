//! Wire tensors and the fixed-width batch builder.
//!
//! Each chunk of spectra becomes three parallel tensors:
//!
//! ```text
//! mzs        [batch, max_peaks]  peak m/z, zero padded
//! intens     [batch, max_peaks]  peak intensity, zero padded
//! num_peaks  [batch, 1]          true (truncated) peak count
//! ```

use std::borrow::Borrow;

use serde::{Deserialize, Serialize};
use spectra::Spectrum;

use crate::error::EncoderError;

/// Closed set of element types this client can put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TensorDataType {
    #[serde(rename = "FP32")]
    Fp32,
    #[serde(rename = "INT32")]
    Int32,
    #[serde(rename = "INT64")]
    Int64,
}

impl TensorDataType {
    /// Protocol datatype code.
    pub fn wire_code(self) -> &'static str {
        match self {
            Self::Fp32 => "FP32",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Fp32)
    }
}

/// Name and element type of one model input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub datatype: TensorDataType,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, datatype: TensorDataType) -> Self {
        Self {
            name: name.into(),
            datatype,
        }
    }
}

/// Input tensor names/types expected by the deployed model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputLayout {
    pub mzs: TensorSpec,
    pub intensities: TensorSpec,
    pub num_peaks: TensorSpec,
}

impl Default for InputLayout {
    fn default() -> Self {
        Self {
            mzs: TensorSpec::new("mzs", TensorDataType::Fp32),
            intensities: TensorSpec::new("intens", TensorDataType::Fp32),
            num_peaks: TensorSpec::new("num_peaks", TensorDataType::Int64),
        }
    }
}

impl InputLayout {
    /// Peak values need a float type and peak counts an integer type. Anything
    /// else can never be encoded, so it is rejected before the first request.
    pub fn validate(&self) -> Result<(), EncoderError> {
        for spec in [&self.mzs, &self.intensities] {
            if !spec.datatype.is_float() {
                return Err(EncoderError::InvalidConfig(format!(
                    "input '{}' must be FP32, got {}",
                    spec.name,
                    spec.datatype.wire_code()
                )));
            }
        }
        if self.num_peaks.datatype.is_float() {
            return Err(EncoderError::InvalidConfig(format!(
                "input '{}' must be INT32 or INT64, got {}",
                self.num_peaks.name,
                self.num_peaks.datatype.wire_code()
            )));
        }
        for spec in [&self.mzs, &self.intensities, &self.num_peaks] {
            if spec.name.trim().is_empty() {
                return Err(EncoderError::InvalidConfig(
                    "input tensor names must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Row-major tensor payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TensorData {
    Fp32(Vec<f32>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
}

impl TensorData {
    pub fn datatype(&self) -> TensorDataType {
        match self {
            Self::Fp32(_) => TensorDataType::Fp32,
            Self::Int32(_) => TensorDataType::Int32,
            Self::Int64(_) => TensorDataType::Int64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Fp32(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn floats(values: Vec<f64>) -> Self {
        Self::Fp32(values.into_iter().map(|v| v as f32).collect())
    }

    fn counts(values: Vec<i64>, datatype: TensorDataType) -> Self {
        match datatype {
            TensorDataType::Int32 => {
                Self::Int32(values.into_iter().map(|v| v.min(i32::MAX as i64) as i32).collect())
            }
            _ => Self::Int64(values),
        }
    }
}

/// One named input tensor ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct InferTensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: TensorData,
}

impl InferTensor {
    pub fn datatype(&self) -> TensorDataType {
        self.data.datatype()
    }
}

/// The three input tensors for one chunk, plus how many spectra lost peaks.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorBatch {
    pub batch_size: usize,
    pub inputs: Vec<InferTensor>,
    pub truncated: usize,
}

/// Build the padded tensors for `spectra`.
///
/// Peaks beyond `max_peaks` are dropped; shorter spectra are zero padded.
pub fn build_batch<S: Borrow<Spectrum>>(
    spectra: &[S],
    max_peaks: usize,
    layout: &InputLayout,
) -> TensorBatch {
    let batch_size = spectra.len();
    let mut mzs = vec![0.0f64; batch_size * max_peaks];
    let mut intensities = vec![0.0f64; batch_size * max_peaks];
    let mut num_peaks = vec![0i64; batch_size];
    let mut truncated = 0;

    for (row, spectrum) in spectra.iter().enumerate() {
        let spectrum = spectrum.borrow();
        if spectrum.peaks.len() > max_peaks {
            truncated += 1;
        }
        let kept = &spectrum.peaks[..spectrum.peaks.len().min(max_peaks)];
        num_peaks[row] = kept.len() as i64;

        let offset = row * max_peaks;
        for (col, peak) in kept.iter().enumerate() {
            mzs[offset + col] = peak.mz;
            intensities[offset + col] = peak.intensity;
        }
    }

    let inputs = vec![
        InferTensor {
            name: layout.mzs.name.clone(),
            shape: vec![batch_size, max_peaks],
            data: TensorData::floats(mzs),
        },
        InferTensor {
            name: layout.intensities.name.clone(),
            shape: vec![batch_size, max_peaks],
            data: TensorData::floats(intensities),
        },
        InferTensor {
            name: layout.num_peaks.name.clone(),
            shape: vec![batch_size, 1],
            data: TensorData::counts(num_peaks, layout.num_peaks.datatype),
        },
    ];

    TensorBatch {
        batch_size,
        inputs,
        truncated,
    }
}
