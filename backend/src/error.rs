use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Image not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("Could not read image at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not decode image {origin}: {source}")]
    Decode {
        origin: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Model artifact not found: {}", path.display())]
    Missing { path: PathBuf },
    #[error("Could not read model artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a TorchScript archive", path.display())]
    NotAModel { path: PathBuf },
    #[error("Model runtime rejected {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
    #[error("Cannot load {}: built without the `torch` feature", path.display())]
    BackendUnavailable { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Input tensor shape {actual:?} does not match expected {expected:?}")]
pub struct ShapeMismatchError {
    pub expected: Vec<usize>,
    pub actual: Vec<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatchError),
    #[error("Model produced {0} outputs, expected a single score")]
    UnexpectedOutput(usize),
    #[error("Model produced a non-finite score: {0}")]
    NonFinite(f32),
    #[error("Model runtime error: {0}")]
    Runtime(String),
}

#[cfg(feature = "torch")]
impl From<tch::TchError> for InferenceError {
    fn from(err: tch::TchError) -> Self {
        InferenceError::Runtime(err.to_string())
    }
}

/// Everything a single prediction request can fail with.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatchError),
    #[error(transparent)]
    Inference(InferenceError),
}

impl From<InferenceError> for PredictError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::ShapeMismatch(e) => PredictError::ShapeMismatch(e),
            other => PredictError::Inference(other),
        }
    }
}

impl PredictError {
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Load(_) => "load_error",
            PredictError::ShapeMismatch(_) => "shape_mismatch",
            PredictError::Inference(_) => "inference_error",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}
