use image::{ImageFormat, Rgb, RgbImage};
use pneumoscan::config::{ImageConfig, ModelConfig};
use pneumoscan::{
    Classifier, Diagnosis, InferenceError, InputTensor, LoadError, ModelLoadError, PredictError,
    Scorer,
};
use std::path::PathBuf;
use uuid::Uuid;

/// Reports the mean normalized intensity as the probability.
struct MeanIntensity;

impl Scorer for MeanIntensity {
    fn score(&self, input: &InputTensor) -> Result<f32, InferenceError> {
        input
            .view()
            .mean()
            .ok_or_else(|| InferenceError::Runtime("empty tensor".into()))
    }
}

fn write_radiograph(width: u32, height: u32, level: u8) -> PathBuf {
    let path = std::env::temp_dir().join(format!("pneumoscan-it-{}.png", Uuid::new_v4()));
    RgbImage::from_pixel(width, height, Rgb([level, level, level]))
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

#[test]
fn bright_film_is_flagged_and_dark_film_is_not() {
    let classifier = Classifier::with_scorer(MeanIntensity, ImageConfig::default());

    let bright = write_radiograph(1024, 768, 230);
    let dark = write_radiograph(300, 500, 20);
    let bright_prediction = classifier.predict_pneumonia(&bright).unwrap();
    let dark_prediction = classifier.predict_pneumonia(&dark).unwrap();
    std::fs::remove_file(&bright).ok();
    std::fs::remove_file(&dark).ok();

    assert_eq!(bright_prediction.label, Diagnosis::Pneumonia);
    assert!((bright_prediction.probability - 230.0 / 255.0).abs() < 0.01);
    assert_eq!(dark_prediction.label, Diagnosis::Normal);
    assert!((dark_prediction.probability - 20.0 / 255.0).abs() < 0.01);
}

#[test]
fn mid_gray_film_scores_near_the_threshold() {
    let classifier = Classifier::with_scorer(MeanIntensity, ImageConfig::default());
    let path = write_radiograph(500, 300, 128);
    let prediction = classifier.predict_pneumonia(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert!((prediction.probability - 0.5).abs() < 0.01);
    assert_eq!(
        prediction.label,
        Diagnosis::from_probability(prediction.probability)
    );
}

#[test]
fn repeated_predictions_agree() {
    let classifier = Classifier::with_scorer(MeanIntensity, ImageConfig::default());
    let path = write_radiograph(640, 640, 90);
    let first = classifier.predict_pneumonia(&path).unwrap();
    let second = classifier.predict_pneumonia(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(first, second);
}

#[test]
fn nonexistent_image_is_a_load_error() {
    let classifier = Classifier::with_scorer(MeanIntensity, ImageConfig::default());
    let err = classifier
        .predict_pneumonia("/nonexistent/chest_xray/person100_bacteria_475.jpeg")
        .unwrap_err();
    assert!(matches!(err, PredictError::Load(LoadError::NotFound { .. })));
}

#[test]
fn startup_fails_on_a_non_model_artifact() {
    let path = write_radiograph(8, 8, 0);
    let model = ModelConfig {
        path: path.clone(),
        ..ModelConfig::default()
    };
    let result = Classifier::load(&model, ImageConfig::default());
    std::fs::remove_file(&path).ok();

    assert!(matches!(result, Err(ModelLoadError::NotAModel { .. })));
}
