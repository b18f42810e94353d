use thiserror::Error;

/// Errors raised by the onset classifier library.
#[derive(Debug, Error)]
pub enum OnsetError {
    #[error("unsupported blur kernel size {0}, expected one of 3, 5, 7")]
    UnsupportedKernelSize(usize),

    #[error("unsupported block stride {0}, expected 1 or 2")]
    UnsupportedStride(usize),

    /// Labels must be `[N]` (per sequence) or `[N, T]` (per timestep).
    #[error("invalid label shape {shape:?} for {sequences} sequences of length {len}")]
    InvalidLabelShape {
        shape: Vec<usize>,
        sequences: usize,
        len: usize,
    },

    #[error("label {0} is not a binary class index")]
    InvalidLabel(i64),

    /// A split without both classes cannot produce a balanced weight table.
    #[error("class {class} does not occur among {total} examples")]
    DegenerateClassBalance { class: usize, total: usize },

    /// AUC and the confusion matrix need both classes in the pass.
    #[error("metric pass over {total} examples contains only class {class}")]
    DegenerateMetricBatch { class: usize, total: usize },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("network produced non-finite logits")]
    NonFiniteOutput,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Npy(#[from] ndarray_npy::ReadNpyError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OnsetError>;
