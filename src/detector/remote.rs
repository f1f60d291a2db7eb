//! HTTP inference backend.
//!
//! Frames are posted as JPEG bytes. The service answers with
//! `{"detections": [{"label": "...", "confidence": 0.0, "box": {...}}]}`.

use crate::capture::Frame;
use crate::core::classifier::{Candidate, DetectionBackend, DetectorError};
use image::codecs::jpeg::JpegEncoder;
use serde::Deserialize;
use std::time::Duration;

const UPLOAD_QUALITY: u8 = 85;

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    detections: Vec<Candidate>,
}

/// Detection backend backed by a remote model server.
///
/// The processing loop is synchronous, so requests run on a private
/// current-thread runtime.
pub struct RemoteDetector {
    url: String,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl RemoteDetector {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DetectorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DetectorError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DetectorError::Unavailable(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            url: url.into(),
            client,
            runtime,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, body: Vec<u8>) -> Result<Vec<Candidate>, DetectorError> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "image/jpeg")
            .body(body)
            .send()
            .await
            .map_err(|e| DetectorError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DetectorError::Inference(format!("{status}: {message}")));
        }

        let parsed: DetectResponse = response
            .json()
            .await
            .map_err(|e| DetectorError::InvalidResponse(e.to_string()))?;
        Ok(parsed.detections)
    }
}

fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, DetectorError> {
    let rgb = frame.image().to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, UPLOAD_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| DetectorError::Inference(format!("JPEG encode failed: {e}")))?;
    Ok(bytes)
}

impl DetectionBackend for RemoteDetector {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Candidate>, DetectorError> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }
        let body = encode_jpeg(frame)?;
        self.runtime.block_on(self.request(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use image::RgbImage;

    #[test]
    fn test_response_parsing() {
        let parsed: DetectResponse = serde_json::from_str(
            r#"{"detections":[{"label":"cat","confidence":0.92,"box":{"x":1,"y":2,"width":30,"height":40}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.detections.len(), 1);
        assert_eq!(parsed.detections[0].bbox.map(|b| b.width), Some(30));

        let empty: DetectResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.detections.is_empty());
    }

    #[test]
    fn test_unreachable_server_is_network_error() {
        let mut detector =
            RemoteDetector::new("http://127.0.0.1:9/detect", Duration::from_millis(200)).unwrap();
        let frame = Frame::from_rgb(RgbImage::new(8, 8), Utc::now(), 0);
        assert!(matches!(
            detector.detect(&frame),
            Err(DetectorError::Network(_))
        ));
    }
}
