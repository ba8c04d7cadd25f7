use crate::config::{ImageConfig, ModelConfig};
use crate::error::{InferenceError, ModelLoadError, PredictError};
use crate::preprocess::{preprocess, preprocess_bytes};
use crate::tensor::InputTensor;
use pneumoscan_shared::Prediction;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// TorchScript artifacts are zip archives.
const TORCHSCRIPT_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// A loaded model: one forward pass per call, returning the pneumonia
/// probability for a single-item batch.
pub trait Scorer: Send + Sync {
    fn score(&self, input: &InputTensor) -> Result<f32, InferenceError>;
}

/// The pretrained classifier together with the preprocessing it expects.
/// Built once at startup and shared read-only afterwards.
pub struct Classifier {
    scorer: Box<dyn Scorer>,
    image: ImageConfig,
}

impl Classifier {
    pub fn with_scorer(scorer: impl Scorer + 'static, image: ImageConfig) -> Self {
        Self {
            scorer: Box::new(scorer),
            image,
        }
    }

    /// Blocking load of the model artifact.
    pub fn load(model: &ModelConfig, image: ImageConfig) -> Result<Self, ModelLoadError> {
        check_artifact(&model.path)?;
        log::info!("Loading model from {}", model.path.display());
        let scorer = load_scorer(model)?;
        log::info!("Model loaded");
        Ok(Self { scorer, image })
    }

    pub fn image_config(&self) -> &ImageConfig {
        &self.image
    }

    pub fn predict(&self, input: &InputTensor) -> Result<Prediction, PredictError> {
        input.check_shape()?;
        let probability = self.scorer.score(input)?;
        if !probability.is_finite() {
            return Err(InferenceError::NonFinite(probability).into());
        }
        let prediction = Prediction::from_probability(probability);
        log::debug!(
            "Scored input: {} ({:.4})",
            prediction.label,
            prediction.probability
        );
        Ok(prediction)
    }

    pub fn predict_pneumonia(
        &self,
        image_path: impl AsRef<Path>,
    ) -> Result<Prediction, PredictError> {
        let image_path = image_path.as_ref();
        let input = preprocess(image_path, &self.image)?;
        let prediction = self.predict(&input)?;
        log::info!(
            "{}: {} (probability {:.4})",
            image_path.display(),
            prediction.label,
            prediction.probability
        );
        Ok(prediction)
    }

    pub fn predict_bytes(&self, image: &[u8]) -> Result<Prediction, PredictError> {
        let input = preprocess_bytes(image, &self.image)?;
        self.predict(&input)
    }
}

fn check_artifact(path: &Path) -> Result<(), ModelLoadError> {
    let mut file = std::fs::File::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ModelLoadError::Missing {
            path: path.to_path_buf(),
        },
        _ => ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == TORCHSCRIPT_MAGIC => Ok(()),
        Ok(()) => Err(ModelLoadError::NotAModel {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(ModelLoadError::NotAModel {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(feature = "torch")]
fn load_scorer(model: &ModelConfig) -> Result<Box<dyn Scorer>, ModelLoadError> {
    let scorer = crate::torch_model::TorchScorer::load(&model.path, model.device)?;
    Ok(Box::new(scorer))
}

#[cfg(not(feature = "torch"))]
fn load_scorer(model: &ModelConfig) -> Result<Box<dyn Scorer>, ModelLoadError> {
    Err(ModelLoadError::BackendUnavailable {
        path: model.path.clone(),
    })
}
