pub mod classifier;
pub mod config;
pub mod error;
pub mod preprocess;
pub mod routes;
pub mod tensor;
#[cfg(feature = "torch")]
pub mod torch_model;

pub use classifier::{Classifier, Scorer};
pub use config::AppConfig;
pub use error::{InferenceError, LoadError, ModelLoadError, PredictError, ShapeMismatchError};
pub use pneumoscan_shared::{DECISION_THRESHOLD, Diagnosis, Prediction};
pub use tensor::InputTensor;
