use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::agents::{DiagnosisPipeline, DiagnosisRequest, StageOutput};
use crate::classifier::Classification;
use crate::config::Config;
use crate::weather::WeatherConditions;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<DiagnosisPipeline>,
}

/// Everything produced by one diagnosis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub plant_name: String,
    pub location: Option<String>,
    pub language: String,
    pub classification: Classification,
    pub weather: Option<WeatherConditions>,
    pub diagnosis: StageOutput,
    pub recovery: StageOutput,
}

impl DiagnosisReport {
    pub fn new(
        request: &DiagnosisRequest,
        classification: Classification,
        weather: Option<WeatherConditions>,
        diagnosis: StageOutput,
        recovery: StageOutput,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            plant_name: request.plant().to_string(),
            location: request.location().map(String::from),
            language: request.language.clone(),
            classification,
            weather,
            diagnosis,
            recovery,
        }
    }
}

// API Request/Response types

/// Text fields of the multipart diagnosis form
#[derive(Debug, Default, Deserialize, Validate)]
pub struct DiagnosisForm {
    #[validate(length(max = 100, message = "location must be at most 100 characters"))]
    pub location: Option<String>,
    #[validate(length(min = 2, max = 35, message = "language must be 2-35 characters"))]
    pub language: String,
    #[validate(length(max = 100, message = "plant name must be at most 100 characters"))]
    pub plant_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub plant_name: String,
    pub label: String,
    pub confidence: f64,
}

impl From<&DiagnosisReport> for ReportSummary {
    fn from(report: &DiagnosisReport) -> Self {
        Self {
            id: report.id,
            created_at: report.created_at,
            plant_name: report.plant_name.clone(),
            label: report.classification.label.to_string(),
            confidence: report.classification.confidence,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub llm_provider: String,
    pub weather: bool,
    pub knowledge_base: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_validation() {
        let ok = DiagnosisForm {
            location: Some("Nairobi, Kenya".to_string()),
            language: "en".to_string(),
            plant_name: None,
        };
        assert!(ok.validate().is_ok());

        let bad_language = DiagnosisForm {
            language: "e".to_string(),
            ..Default::default()
        };
        assert!(bad_language.validate().is_err());

        let long_location = DiagnosisForm {
            location: Some("x".repeat(101)),
            language: "sw".to_string(),
            plant_name: None,
        };
        let errors = long_location.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("location"));
    }
}
