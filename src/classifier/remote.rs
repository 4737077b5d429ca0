// Classifier backed by a TensorFlow-Serving style REST predict endpoint

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Classification, DiseaseClassifier, UploadedImage};
use crate::config::ClassifierConfig;
use crate::types::{AppError, AppResult};

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
}

#[derive(Serialize)]
struct PredictInstance {
    b64: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<Vec<f64>>,
}

pub struct RemoteClassifier {
    client: Client,
    url: String,
}

impl RemoteClassifier {
    pub fn new(config: &ClassifierConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build classifier client: {}", e)))?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl DiseaseClassifier for RemoteClassifier {
    async fn classify(&self, image: &UploadedImage) -> AppResult<Classification> {
        debug!(bytes = image.data.len(), format = ?image.format, "Sending image to classifier");

        let request = PredictRequest {
            instances: vec![PredictInstance {
                b64: BASE64.encode(&image.data),
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Classifier(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Classifier(format!(
                "model server returned {}: {}",
                status, body
            )));
        }

        let predict: PredictResponse = response
            .json()
            .await
            .map_err(|e| AppError::Classifier(format!("invalid predict response: {}", e)))?;

        let scores = predict
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Classifier("model server returned no predictions".to_string()))?;

        let classification = Classification::from_probabilities(&scores)?;
        info!(
            label = %classification.label,
            confidence = classification.confidence,
            "Image classified"
        );
        Ok(classification)
    }
}
