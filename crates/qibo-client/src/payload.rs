//! Decoding of the numeric payload shipped inside the result archive.

use std::fmt;
use std::path::Path;

use ndarray::ArrayD;
use ndarray_npy::{ReadNpyError, read_npy};
use num_complex::Complex64;

use crate::error::{ClientError, ClientResult};

/// File name of the payload at the root of the result archive.
pub const RESULTS_FILE_NAME: &str = "results.npy";

/// Decoded result of a circuit execution.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantumState {
    /// Complex amplitudes (state vector or density matrix).
    Amplitudes(ArrayD<Complex64>),
    /// Real-valued data such as probabilities or frequencies.
    Real(ArrayD<f64>),
}

impl QuantumState {
    /// Shape of the underlying array.
    pub fn shape(&self) -> &[usize] {
        match self {
            QuantumState::Amplitudes(a) => a.shape(),
            QuantumState::Real(a) => a.shape(),
        }
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        match self {
            QuantumState::Amplitudes(a) => a.len(),
            QuantumState::Real(a) => a.len(),
        }
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Complex amplitudes, if this is a complex payload.
    pub fn amplitudes(&self) -> Option<&ArrayD<Complex64>> {
        match self {
            QuantumState::Amplitudes(a) => Some(a),
            QuantumState::Real(_) => None,
        }
    }

    /// Measurement probabilities.
    ///
    /// Squared moduli for complex vectors; real payloads are returned as is.
    pub fn probabilities(&self) -> ArrayD<f64> {
        match self {
            QuantumState::Amplitudes(a) => a.mapv(|c| c.norm_sqr()),
            QuantumState::Real(a) => a.clone(),
        }
    }
}

impl fmt::Display for QuantumState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantumState::Amplitudes(a) => write!(f, "{a}"),
            QuantumState::Real(a) => write!(f, "{a}"),
        }
    }
}

/// Load the `.npy` payload at `path`.
///
/// Complex128 arrays are tried first, then float64. Failures are fatal and
/// reported as [`ClientError::PayloadDecode`].
pub fn load_payload(path: &Path) -> ClientResult<QuantumState> {
    let decode_error = |e: ReadNpyError| ClientError::PayloadDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    match read_npy::<_, ArrayD<Complex64>>(path) {
        Ok(array) => Ok(QuantumState::Amplitudes(array)),
        Err(ReadNpyError::WrongDescriptor(_)) => read_npy::<_, ArrayD<f64>>(path)
            .map(QuantumState::Real)
            .map_err(decode_error),
        Err(e) => Err(decode_error(e)),
    }
}
