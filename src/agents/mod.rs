//! Agent System
//!
//! Runs the diagnosis pipeline for one uploaded leaf image:
//!
//! ```text
//! Leaf image + location
//!      │
//!      ▼
//! ┌─────────────┐
//! │ Classifier  │  → disease label + confidence
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Weather    │  → prompt conditions (optional)
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │ Agriculture │  → prevention & treatment advice
//! │   Expert    │     (written back to the knowledge base)
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Recovery   │  → fertilizer & nutrient plan
//! │ Specialist  │
//! └─────────────┘
//!      │
//!      ▼
//!  Persisted report
//! ```

pub mod profile;
pub mod runner;
pub mod task;

pub use profile::AdvisorProfile;
pub use runner::{StageOutput, StageRunner, StageSettings};
pub use task::{render_template, TaskInputs, TaskKind, TaskTemplate};

use std::sync::Arc;

use tracing::{info, warn};

use crate::classifier::{Classification, DiseaseClassifier, UploadedImage};
use crate::knowledge::KnowledgeStore;
use crate::models::DiagnosisReport;
use crate::storage::ReportStore;
use crate::types::AppResult;
use crate::weather::{WeatherConditions, WeatherProvider};

pub const UNSPECIFIED_PLANT: &str = "unspecified";

/// Inputs for one pipeline run
#[derive(Debug, Clone)]
pub struct DiagnosisRequest {
    pub image: UploadedImage,
    pub location: Option<String>,
    pub language: String,
    pub plant_name: Option<String>,
}

impl DiagnosisRequest {
    pub fn plant(&self) -> &str {
        self.plant_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNSPECIFIED_PLANT)
    }

    pub fn location(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Prompt variables shared by both advisory stages
pub fn build_inputs(
    request: &DiagnosisRequest,
    classification: &Classification,
    weather: Option<&WeatherConditions>,
) -> TaskInputs {
    let label = classification.label.to_string();
    let mut inputs = TaskInputs::new();
    inputs
        .set("question", label.clone())
        .set("predicted_class", label)
        .set("name", request.plant())
        .set("language", request.language.clone());

    let weather_values = match weather {
        Some(w) => w.prompt_values(),
        None => WeatherConditions::unavailable_values(),
    };
    for (key, value) in weather_values {
        inputs.set(key, value);
    }
    inputs
}

/// Key under which diagnosis advice is written back to the knowledge base
pub fn knowledge_key(request: &DiagnosisRequest, classification: &Classification) -> String {
    [
        classification.label.as_str(),
        request.plant_name.as_deref().map(str::trim).unwrap_or_default(),
        request.location().unwrap_or_default(),
    ]
    .iter()
    .filter(|s| !s.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" ")
}

#[derive(Clone)]
pub struct DiagnosisPipeline {
    classifier: Arc<dyn DiseaseClassifier>,
    weather: Arc<dyn WeatherProvider>,
    knowledge: Arc<dyn KnowledgeStore>,
    runner: StageRunner,
    reports: ReportStore,
}

impl DiagnosisPipeline {
    pub fn new(
        classifier: Arc<dyn DiseaseClassifier>,
        weather: Arc<dyn WeatherProvider>,
        knowledge: Arc<dyn KnowledgeStore>,
        runner: StageRunner,
        reports: ReportStore,
    ) -> Self {
        Self {
            classifier,
            weather,
            knowledge,
            runner,
            reports,
        }
    }

    pub fn reports(&self) -> &ReportStore {
        &self.reports
    }

    pub fn weather_enabled(&self) -> bool {
        self.weather.is_configured()
    }

    pub fn knowledge_enabled(&self) -> bool {
        self.knowledge.is_enabled()
    }

    async fn fetch_weather(&self, request: &DiagnosisRequest) -> Option<WeatherConditions> {
        let location = request.location()?;
        if !self.weather.is_configured() {
            warn!("Weather API not configured, advising without weather data");
            return None;
        }
        match self.weather.current(location).await {
            Ok(conditions) => Some(conditions),
            Err(e) => {
                warn!(error = %e, location = %location, "Weather lookup failed, advising without weather data");
                None
            }
        }
    }

    /// Execute the full diagnosis pipeline and persist the report
    pub async fn run(&self, request: DiagnosisRequest) -> AppResult<DiagnosisReport> {
        info!(
            image_bytes = request.image.data.len(),
            location = ?request.location(),
            language = %request.language,
            "Starting diagnosis pipeline"
        );

        // Step 1: classify the leaf image
        let classification = self.classifier.classify(&request.image).await?;

        // Step 2: weather conditions for the prompts
        let weather = self.fetch_weather(&request).await;
        let inputs = build_inputs(&request, &classification, weather.as_ref());

        // Step 3: prevention and treatment
        let diagnosis = self
            .runner
            .run(
                &AdvisorProfile::agriculture_expert(),
                &TaskTemplate::diagnosis(),
                &inputs,
                None,
            )
            .await?;

        // Step 4: remember the advice for future similar cases
        if self.knowledge.is_enabled() {
            let key = knowledge_key(&request, &classification);
            if let Err(e) = self.knowledge.store(&key, &diagnosis.content).await {
                warn!(error = %e, key = %key, "Failed to store advice in knowledge base");
            }
        }

        // Step 5: recovery and fertilizer plan
        let recovery = self
            .runner
            .run(
                &AdvisorProfile::recovery_specialist(),
                &TaskTemplate::recovery(),
                &inputs,
                Some(&diagnosis),
            )
            .await?;

        // Step 6: persist
        let report = DiagnosisReport::new(&request, classification, weather, diagnosis, recovery);
        self.reports.save(&report).await?;

        info!(
            report_id = %report.id,
            label = %report.classification.label,
            "Diagnosis pipeline complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::weather::WeatherError;
    use async_trait::async_trait;

    pub struct FakeWeather(pub Option<WeatherConditions>);

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn current(&self, _location: &str) -> Result<WeatherConditions, WeatherError> {
            self.0
                .clone()
                .ok_or_else(|| WeatherError::Network("connection refused".to_string()))
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    pub fn nairobi() -> WeatherConditions {
        WeatherConditions {
            location: "Nairobi".to_string(),
            country: "Kenya".to_string(),
            temperature_c: 22.0,
            feels_like_c: 23.5,
            condition: "Partly cloudy".to_string(),
            humidity: 64.0,
            wind: "14.4 kph NE".to_string(),
            uv_index: 6.0,
        }
    }
}
