use crate::error::ShapeMismatchError;
use ndarray::{Array4, ArrayView4};

pub const INPUT_SIZE: u32 = 224;
pub const INPUT_CHANNELS: usize = 3;
/// Batch, height, width, channels.
pub const INPUT_SHAPE: [usize; 4] = [1, INPUT_SIZE as usize, INPUT_SIZE as usize, INPUT_CHANNELS];

/// Single-item NHWC batch of normalized pixel values.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Array4<f32>,
}

impl InputTensor {
    /// Wraps any 4-d array. The shape is checked when the tensor is scored.
    pub fn from_array(data: Array4<f32>) -> Self {
        Self { data }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// Contiguous row-major values, if the backing array is in standard layout.
    pub fn as_slice(&self) -> Option<&[f32]> {
        self.data.as_slice()
    }

    pub fn check_shape(&self) -> Result<(), ShapeMismatchError> {
        if self.shape() == INPUT_SHAPE {
            Ok(())
        } else {
            Err(ShapeMismatchError {
                expected: INPUT_SHAPE.to_vec(),
                actual: self.shape().to_vec(),
            })
        }
    }

    pub fn into_inner(self) -> Array4<f32> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_expected_shape() {
        let tensor = InputTensor::from_array(Array4::zeros(INPUT_SHAPE));
        assert!(tensor.check_shape().is_ok());
        assert_eq!(tensor.as_slice().map(|s| s.len()), Some(224 * 224 * 3));
    }

    #[test]
    fn reports_channel_first_layout() {
        let tensor = InputTensor::from_array(Array4::zeros((1, 3, 224, 224)));
        let err = tensor.check_shape().unwrap_err();
        assert_eq!(err.actual, vec![1, 3, 224, 224]);
        assert_eq!(err.expected, vec![1, 224, 224, 3]);
    }
}
