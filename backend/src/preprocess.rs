use crate::config::{ChannelOrder, ImageConfig};
use crate::error::LoadError;
use crate::tensor::{INPUT_SHAPE, INPUT_SIZE, InputTensor};
use image::{DynamicImage, ImageDecoder, ImageError, ImageReader, imageops};
use ndarray::Array4;
use std::io::{Cursor, ErrorKind};
use std::path::Path;

/// Loads the image at `path` and turns it into a model-ready tensor.
pub fn preprocess(
    path: impl AsRef<Path>,
    config: &ImageConfig,
) -> Result<InputTensor, LoadError> {
    let image = load_image(path)?;
    Ok(to_tensor(&image, config))
}

/// Same pipeline as [`preprocess`] for an already-read file.
pub fn preprocess_bytes(bytes: &[u8], config: &ImageConfig) -> Result<InputTensor, LoadError> {
    let image = decode_image(bytes, "upload")?;
    Ok(to_tensor(&image, config))
}

pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => LoadError::NotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    decode_image(&bytes, &path.display().to_string())
}

/// Decodes and rotates/flips the pixels upright according to the EXIF
/// orientation tag, when the format carries one.
fn decode_image(bytes: &[u8], origin: &str) -> Result<DynamicImage, LoadError> {
    decode_oriented(bytes).map_err(|source| LoadError::Decode {
        origin: origin.to_string(),
        source,
    })
}

fn decode_oriented(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?
        .into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// Resizes to 224x224 without preserving aspect ratio and scales every
/// channel to [0, 1].
pub fn to_tensor(image: &DynamicImage, config: &ImageConfig) -> InputTensor {
    let rgb = image.to_rgb8();
    let resized = imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, config.resize_method.into());

    let mut data = Array4::<f32>::zeros(INPUT_SHAPE);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let channels = match config.channel_order {
            ChannelOrder::Bgr => [b, g, r],
            ChannelOrder::Rgb => [r, g, b],
        };
        for (c, value) in channels.into_iter().enumerate() {
            data[[0, y as usize, x as usize, c]] = f32::from(value) / 255.0;
        }
    }
    InputTensor::from_array(data)
}

/// Case-insensitive check of the file extension against the advertised list.
pub fn is_supported_extension(path: impl AsRef<Path>, extensions: &[String]) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
}
