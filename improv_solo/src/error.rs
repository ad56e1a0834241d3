// Error type for the solo generator.
//
// Weight validation and configuration problems surface before any
// generation starts. `PitchOutOfRange` marks a logic error in projection or
// sampling and is never expected in a correct build. Degraded inputs
// (unknown chord qualities) and numeric fallbacks are not errors; they are
// logged and the run continues.

use std::path::PathBuf;

/// Result alias using [`SoloError`].
pub type Result<T> = std::result::Result<T, SoloError>;

#[derive(Debug, thiserror::Error)]
pub enum SoloError {
    /// A required tensor is absent from a weight bundle.
    #[error("weight bundle '{bundle}': missing tensor '{tensor}'")]
    MissingTensor { bundle: String, tensor: String },

    /// A tensor exists but its declared shape is not what the layer needs.
    #[error("weight bundle '{bundle}': tensor '{tensor}' has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        bundle: String,
        tensor: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// The flat data length disagrees with the product of the shape.
    #[error("weight bundle '{bundle}': tensor '{tensor}' holds {found} values but its shape needs {expected}")]
    DataLength {
        bundle: String,
        tensor: String,
        expected: usize,
        found: usize,
    },

    /// A weight is NaN or infinite.
    #[error("weight bundle '{bundle}': tensor '{tensor}' has a non-finite value at index {index}")]
    NonFiniteWeight {
        bundle: String,
        tensor: String,
        index: usize,
    },

    /// Declared input/output width does not fit the expert's vocabulary.
    #[error("weight bundle '{bundle}': declared {what} size {found}, expected {expected}")]
    VocabularyMismatch {
        bundle: String,
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Invalid generation settings or progression.
    #[error("config: {0}")]
    Config(String),

    /// Malformed chord symbol or progression text.
    #[error("parse: {0}")]
    Parse(String),

    /// A pitch outside [LOW_BOUND, HIGH_BOUND) was produced.
    #[error("pitch {0} is outside the generator's range")]
    PitchOutOfRange(i32),

    /// The final combined distribution could not be sampled.
    #[error("combined distribution has no mass at timestep {0}")]
    EmptyDistribution(u32),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
