//! HuggingFace Inference Detector
//!
//! Object detection via the HuggingFace inference API. The raw image bytes
//! are posted as the request body; the API answers with a flat list of
//! `{score, label, box}` entries which are filtered by confidence and given
//! stable 1-based ids.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use super::ObjectDetector;
use crate::config::HuggingFaceConfig;
use crate::types::{
    BoundingBox, DetectedObject, ErrorClassifier, LingoError, Result,
};

const DETECTOR_NAME: &str = "huggingface";

pub struct HuggingFaceDetector {
    api_key: Option<SecretString>,
    api_base: String,
    model: String,
    min_confidence: f32,
    client: reqwest::Client,
}

impl std::fmt::Debug for HuggingFaceDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceDetector")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}

impl HuggingFaceDetector {
    /// The inference API accepts anonymous requests at a lower rate limit,
    /// so a missing key is allowed here, unlike the chat providers.
    pub fn new(config: &HuggingFaceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LingoError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_key: config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            api_base: config.api_base.clone(),
            model: config.detection_model.clone(),
            min_confidence: config.min_confidence,
            client,
        })
    }
}

#[async_trait]
impl ObjectDetector for HuggingFaceDetector {
    async fn detect(&self, image: &[u8]) -> Result<Vec<DetectedObject>> {
        let url = format!("{}/models/{}", self.api_base, self.model);
        debug!(model = %self.model, bytes = image.len(), "sending detection request");

        let mut builder = self.client.post(&url).body(image.to_vec());
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, DETECTOR_NAME))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_status(status, &body, DETECTOR_NAME).into());
        }

        let detections: Vec<Detection> = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, DETECTOR_NAME))?;

        Ok(convert_detections(detections, self.min_confidence))
    }

    fn name(&self) -> &str {
        DETECTOR_NAME
    }
}

fn convert_detections(detections: Vec<Detection>, min_confidence: f32) -> Vec<DetectedObject> {
    detections
        .into_iter()
        .filter(|d| d.score >= min_confidence)
        .enumerate()
        .map(|(i, d)| DetectedObject {
            id: i as u32 + 1,
            name: d.label,
            confidence: d.score,
            bbox: BoundingBox {
                xmin: d.bbox.xmin,
                ymin: d.bbox.ymin,
                xmax: d.bbox.xmax,
                ymax: d.bbox.ymax,
            },
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct Detection {
    score: f32,
    label: String,
    #[serde(rename = "box")]
    bbox: DetectionBox,
}

#[derive(Debug, Deserialize)]
struct DetectionBox {
    xmin: i32,
    ymin: i32,
    xmax: i32,
    ymax: i32,
}
