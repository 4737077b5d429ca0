//! Disease Classifier
//!
//! The image model itself runs behind a model-serving endpoint. This module
//! owns the upload checks, the label set, and the interpretation of the
//! probability vector the model returns.

pub mod remote;

pub use remote::RemoteClassifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{AppError, AppResult};

/// Disease categories in the model's output index order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiseaseClass {
    Bacteria,
    Fungus,
    Healthy,
    Pests,
    Virus,
}

impl DiseaseClass {
    pub const ALL: [DiseaseClass; 5] = [
        DiseaseClass::Bacteria,
        DiseaseClass::Fungus,
        DiseaseClass::Healthy,
        DiseaseClass::Pests,
        DiseaseClass::Virus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiseaseClass::Bacteria => "Bacteria",
            DiseaseClass::Fungus => "Fungus",
            DiseaseClass::Healthy => "Healthy",
            DiseaseClass::Pests => "Pests",
            DiseaseClass::Virus => "Virus",
        }
    }
}

impl std::fmt::Display for DiseaseClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub label: DiseaseClass,
    /// Top probability as a percentage
    pub confidence: f64,
    pub probabilities: Vec<f64>,
}

impl Classification {
    /// Pick the most probable class from a model output vector
    pub fn from_probabilities(probabilities: &[f64]) -> AppResult<Self> {
        if probabilities.len() != DiseaseClass::ALL.len() {
            return Err(AppError::Classifier(format!(
                "expected {} class scores, got {}",
                DiseaseClass::ALL.len(),
                probabilities.len()
            )));
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(AppError::Classifier(
                "classifier returned a non-finite score".to_string(),
            ));
        }

        // First maximum wins on ties, matching argmax
        let (index, max) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, p)| {
                if p > best.1 {
                    (i, p)
                } else {
                    best
                }
            });

        Ok(Self {
            label: DiseaseClass::ALL[index],
            confidence: max * 100.0,
            probabilities: probabilities.to_vec(),
        })
    }
}

/// Accepted upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn mime(&self) -> mime::Mime {
        match self {
            ImageFormat::Jpeg => mime::IMAGE_JPEG,
            ImageFormat::Png => mime::IMAGE_PNG,
        }
    }

    fn sniff(data: &[u8]) -> Option<Self> {
        const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if data.starts_with(PNG_MAGIC) {
            Some(ImageFormat::Png)
        } else {
            None
        }
    }
}

/// A leaf image uploaded for one diagnosis
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: Option<String>,
    pub format: ImageFormat,
    pub data: bytes::Bytes,
}

impl UploadedImage {
    pub fn from_bytes(filename: Option<String>, data: bytes::Bytes) -> AppResult<Self> {
        if data.is_empty() {
            return Err(AppError::InvalidRequest("uploaded image is empty".to_string()));
        }
        let format = ImageFormat::sniff(&data).ok_or_else(|| {
            AppError::InvalidRequest("image must be a JPEG or PNG file".to_string())
        })?;
        Ok(Self {
            filename,
            format,
            data,
        })
    }
}

#[async_trait]
pub trait DiseaseClassifier: Send + Sync {
    async fn classify(&self, image: &UploadedImage) -> AppResult<Classification>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_picks_label() {
        let result = Classification::from_probabilities(&[0.05, 0.7, 0.1, 0.1, 0.05]).unwrap();
        assert_eq!(result.label, DiseaseClass::Fungus);
        assert!((result.confidence - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_argmax_first_max_wins() {
        let result = Classification::from_probabilities(&[0.1, 0.1, 0.4, 0.4, 0.0]).unwrap();
        assert_eq!(result.label, DiseaseClass::Healthy);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(Classification::from_probabilities(&[]).is_err());
        assert!(Classification::from_probabilities(&[0.5, 0.5]).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = Classification::from_probabilities(&[0.1, f64::NAN, 0.2, 0.3, 0.4]).unwrap_err();
        assert!(matches!(err, AppError::Classifier(_)));
    }

    #[test]
    fn test_image_sniffing() {
        let png = bytes::Bytes::from_static(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR");
        let image = UploadedImage::from_bytes(None, png).unwrap();
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!(image.format.mime(), mime::IMAGE_PNG);

        assert_eq!(testing::jpeg().format, ImageFormat::Jpeg);

        let gif = bytes::Bytes::from_static(b"GIF89a....");
        assert!(matches!(
            UploadedImage::from_bytes(None, gif),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(UploadedImage::from_bytes(None, bytes::Bytes::new()).is_err());
    }

    #[test]
    fn test_label_display() {
        let labels: Vec<String> = DiseaseClass::ALL.iter().map(|c| c.to_string()).collect();
        assert_eq!(labels, ["Bacteria", "Fungus", "Healthy", "Pests", "Virus"]);
    }
}
