use crate::classifier::Scorer;
use crate::config::DevicePreference;
use crate::error::{InferenceError, ModelLoadError};
use crate::tensor::{INPUT_SHAPE, InputTensor};
use std::path::Path;
use std::sync::Mutex;
use tch::{CModule, Device, Kind, Tensor};

/// TorchScript export of the classifier.
pub struct TorchScorer {
    model: Mutex<CModule>,
    device: Device,
}

impl TorchScorer {
    pub fn load(path: &Path, preference: DevicePreference) -> Result<Self, ModelLoadError> {
        let device = match preference {
            DevicePreference::Cpu => Device::Cpu,
            DevicePreference::CudaIfAvailable => Device::cuda_if_available(),
        };
        let mut model =
            CModule::load_on_device(path, device).map_err(|e| ModelLoadError::Invalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        model.set_eval();
        log::info!("TorchScript module ready on {:?}", device);

        Ok(Self {
            model: Mutex::new(model),
            device,
        })
    }

    fn to_torch(&self, input: &InputTensor) -> Result<Tensor, InferenceError> {
        let values = input
            .as_slice()
            .ok_or_else(|| InferenceError::Runtime("input tensor is not contiguous".into()))?;
        let shape = INPUT_SHAPE.map(|d| d as i64);
        Ok(Tensor::from_slice(values)
            .view(shape)
            .to_device(self.device))
    }
}

impl Scorer for TorchScorer {
    fn score(&self, input: &InputTensor) -> Result<f32, InferenceError> {
        input.check_shape()?;
        let tensor = self.to_torch(input)?;
        let model = self
            .model
            .lock()
            .map_err(|_| InferenceError::Runtime("model mutex poisoned".into()))?;

        let output = tch::no_grad(|| model.forward_ts(&[tensor]))?;
        let output = output.to_kind(Kind::Float).view([-1]);
        let elements = output.numel();
        if elements != 1 {
            return Err(InferenceError::UnexpectedOutput(elements));
        }
        Ok(output.double_value(&[0]) as f32)
    }
}
