use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{debug, info};
use validator::Validate;

use crate::agents::DiagnosisRequest;
use crate::classifier::UploadedImage;
use crate::models::{AppState, DiagnosisForm, DiagnosisReport};
use crate::types::{AppError, AppResult};

const DEFAULT_LANGUAGE: &str = "en";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/diagnose", post(diagnose))
        .with_state(state)
}

/// Body-limit rejections keep their 413; anything else is a bad form
fn upload_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::InvalidRequest(format!("malformed upload: {}", e.body_text()))
    }
}

fn optional_text(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Collect the image and text fields from the upload form
async fn read_form(mut multipart: Multipart) -> AppResult<(UploadedImage, DiagnosisForm)> {
    let mut image = None;
    let mut form = DiagnosisForm {
        language: DEFAULT_LANGUAGE.to_string(),
        ..Default::default()
    };

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let filename = field.file_name().map(String::from);
                let data = field.bytes().await.map_err(upload_error)?;
                image = Some(UploadedImage::from_bytes(filename, data)?);
            }
            "location" => form.location = optional_text(field.text().await.map_err(upload_error)?),
            "plant_name" => form.plant_name = optional_text(field.text().await.map_err(upload_error)?),
            "language" => {
                if let Some(language) = optional_text(field.text().await.map_err(upload_error)?) {
                    form.language = language;
                }
            }
            other => debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    let image = image
        .ok_or_else(|| AppError::InvalidRequest("missing 'image' file field".to_string()))?;
    form.validate()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
    Ok((image, form))
}

async fn diagnose(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<DiagnosisReport>> {
    let (image, form) = read_form(multipart).await?;
    info!(
        filename = ?image.filename,
        bytes = image.data.len(),
        location = ?form.location,
        "Diagnosis request received"
    );

    let request = DiagnosisRequest {
        image,
        location: form.location,
        language: form.language,
        plant_name: form.plant_name,
    };
    let report = state.pipeline.run(request).await?;
    Ok(Json(report))
}
