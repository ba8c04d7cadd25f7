use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use pneumoscan_shared::{ErrorResponse, InferenceRequest, PredictionResponse};
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::config::AppConfig;
use crate::error::{LoadError, PredictError};
use crate::preprocess::is_supported_extension;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unsupported file type: {0}")]
    UnsupportedMediaType(String),
    #[error("Image exceeds the {0} byte upload limit")]
    PayloadTooLarge(usize),
    #[error(transparent)]
    Predict(#[from] PredictError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::UnsupportedMediaType(_) => "unsupported_media_type",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Predict(PredictError::Load(LoadError::Base64(_))) => "bad_request",
            ApiError::Predict(e) => e.kind(),
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Predict(PredictError::Load(LoadError::Base64(_))) => StatusCode::BAD_REQUEST,
            ApiError::Predict(PredictError::Load(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Predict(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            kind: self.kind().to_string(),
        })
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, max_upload_bytes: usize) {
    // base64 inflates the payload by a third
    let json_limit = max_upload_bytes / 3 * 4 + 4096;
    cfg.app_data(web::JsonConfig::default().limit(json_limit))
        .service(web::resource("/api/predict").route(web::post().to(handle_predict)))
        .service(web::resource("/api/predict/base64").route(web::post().to(handle_predict_base64)))
        .service(web::resource("/api/health").route(web::get().to(health)));
}

async fn handle_predict(
    classifier: web::Data<Classifier>,
    config: web::Data<AppConfig>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let max_bytes = config.server.max_upload_bytes;
    let mut image: Option<Vec<u8>> = None;
    // Counted across every field of the request.
    let mut total_bytes = 0usize;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);

        let mut image_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            total_bytes += data.len();
            if total_bytes > max_bytes {
                return Err(ApiError::PayloadTooLarge(max_bytes));
            }
            if !data.is_empty() && image.is_some() {
                return Err(ApiError::BadRequest("expected a single image".into()));
            }
            image_data.extend_from_slice(&data);
        }
        if image_data.is_empty() {
            continue;
        }

        let name = file_name
            .ok_or_else(|| ApiError::BadRequest("image field has no filename".into()))?;
        if !is_supported_extension(&name, &config.input.extensions) {
            return Err(ApiError::UnsupportedMediaType(name));
        }
        image = Some(image_data);
    }

    let image = image.ok_or_else(|| ApiError::BadRequest("no image in upload".into()))?;

    run_prediction(classifier, image).await
}

async fn handle_predict_base64(
    classifier: web::Data<Classifier>,
    config: web::Data<AppConfig>,
    request: web::Json<InferenceRequest>,
) -> Result<HttpResponse, ApiError> {
    // Accept data URLs as produced by browser file readers.
    let encoded = match request.image_data.split_once("base64,") {
        Some((_, data)) => data,
        None => request.image_data.as_str(),
    };
    let image = STANDARD
        .decode(encoded.trim())
        .map_err(|e| PredictError::Load(LoadError::from(e)))?;

    let max_bytes = config.server.max_upload_bytes;
    if image.len() > max_bytes {
        return Err(ApiError::PayloadTooLarge(max_bytes));
    }
    if image.is_empty() {
        return Err(ApiError::BadRequest("empty image payload".into()));
    }

    run_prediction(classifier, image).await
}

async fn run_prediction(
    classifier: web::Data<Classifier>,
    image: Vec<u8>,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let image_sha256 = image_digest(&image);

    let result = web::block(move || classifier.predict_bytes(&image))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    match result {
        Ok(prediction) => {
            info!(
                "Request {} [{}]: {} ({:.4})",
                request_id,
                &image_sha256[..12],
                prediction.label,
                prediction.probability
            );
            let response = PredictionResponse::new(
                request_id.to_string(),
                &prediction,
                image_sha256,
                chrono::Utc::now().to_rfc3339(),
            );
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            error!("Request {} [{}] failed: {}", request_id, &image_sha256[..12], e);
            Err(e.into())
        }
    }
}

async fn health(config: web::Data<AppConfig>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "model": config.model.path.display().to_string(),
    }))
}

pub fn image_digest(image_data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_data);
    hex::encode(hasher.finalize())
}
