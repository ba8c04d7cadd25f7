use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Probabilities strictly above this value are reported as pneumonia.
pub const DECISION_THRESHOLD: f32 = 0.5;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Diagnosis {
    Pneumonia,
    Normal,
}

impl Diagnosis {
    /// A tie at exactly the threshold resolves to `Normal`.
    pub fn from_probability(probability: f32) -> Self {
        if probability > DECISION_THRESHOLD {
            Diagnosis::Pneumonia
        } else {
            Diagnosis::Normal
        }
    }

    pub fn finding(&self) -> &'static str {
        match self {
            Diagnosis::Pneumonia => "CRITICAL FINDING",
            Diagnosis::Normal => "NORMAL FINDING",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Diagnosis::Pneumonia => "Recommend immediate clinical correlation",
            Diagnosis::Normal => "No immediate intervention required",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Diagnosis,
    pub probability: f32,
}

impl Prediction {
    pub fn from_probability(probability: f32) -> Self {
        Self {
            label: Diagnosis::from_probability(probability),
            probability,
        }
    }

    /// Display value for confidence meters. Clamping here never touches
    /// `probability` itself.
    pub fn confidence_percent(&self) -> f32 {
        (self.probability * 100.0).clamp(0.0, 100.0)
    }
}

pub fn format_confidence(probability: f32) -> String {
    format!("{:.1}%", (probability * 100.0).clamp(0.0, 100.0))
}

#[derive(Serialize, Deserialize, Clone)]
pub struct InferenceRequest {
    /// Base64 encoded image file contents.
    pub image_data: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PredictionResponse {
    pub request_id: String,
    pub label: Diagnosis,
    pub probability: f32,
    pub confidence_percent: f32,
    pub finding: String,
    pub recommendation: String,
    pub image_sha256: String,
    pub analyzed_at: String,
}

impl PredictionResponse {
    pub fn new(
        request_id: String,
        prediction: &Prediction,
        image_sha256: String,
        analyzed_at: String,
    ) -> Self {
        Self {
            request_id,
            label: prediction.label,
            probability: prediction.probability,
            confidence_percent: prediction.confidence_percent(),
            finding: prediction.label.finding().to_string(),
            recommendation: prediction.label.recommendation().to_string(),
            image_sha256,
            analyzed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn threshold_is_strict() {
        assert_eq!(Diagnosis::from_probability(0.5), Diagnosis::Normal);
        assert_eq!(Diagnosis::from_probability(0.500_001), Diagnosis::Pneumonia);
        assert_eq!(Diagnosis::from_probability(0.0), Diagnosis::Normal);
        assert_eq!(Diagnosis::from_probability(1.0), Diagnosis::Pneumonia);
    }

    #[test]
    fn threshold_law_over_a_sweep() {
        for step in 0..=1000 {
            let p = step as f32 / 1000.0;
            let expected = if p > 0.5 {
                Diagnosis::Pneumonia
            } else {
                Diagnosis::Normal
            };
            assert_eq!(Diagnosis::from_probability(p), expected, "p = {p}");
        }
    }

    #[test]
    fn labels_render_uppercase() {
        assert_eq!(Diagnosis::Pneumonia.to_string(), "PNEUMONIA");
        assert_eq!(Diagnosis::Normal.as_ref(), "NORMAL");
        assert_eq!(Diagnosis::from_str("PNEUMONIA").unwrap(), Diagnosis::Pneumonia);
        assert_eq!(
            serde_json::to_string(&Diagnosis::Normal).unwrap(),
            "\"NORMAL\""
        );
    }

    #[test]
    fn confidence_display_is_clamped_but_probability_is_not() {
        let prediction = Prediction::from_probability(1.2);
        assert_eq!(prediction.confidence_percent(), 100.0);
        assert_eq!(prediction.probability, 1.2);
        assert_eq!(format_confidence(0.8734), "87.3%");
        assert_eq!(format_confidence(-0.1), "0.0%");
    }

    #[test]
    fn response_carries_finding_text() {
        let prediction = Prediction::from_probability(0.9);
        let response = PredictionResponse::new(
            "req".into(),
            &prediction,
            "abc".into(),
            "2024-01-01T00:00:00Z".into(),
        );
        assert_eq!(response.label, Diagnosis::Pneumonia);
        assert_eq!(response.finding, "CRITICAL FINDING");
        assert_eq!(
            response.recommendation,
            "Recommend immediate clinical correlation"
        );
        assert!((response.confidence_percent - 90.0).abs() < 1e-4);
    }
}
