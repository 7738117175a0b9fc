//! HTTP client for the identification service.
//!
//! Phase 1 posts both images as `multipart/form-data` (`front_image`,
//! `back_image`) and reads the scan identifier from the JSON reply.
//! Phase 2 gets the result document for that identifier.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};

use super::types::IdentificationResult;
use super::{IdentificationService, ScanId};
use crate::capture::encoding::EncodedImage;
use crate::config::ServiceConfig;
use crate::error::{AnalysisError, AnalysisPhase};
use crate::navigation::{ImagePair, ImageSide};

/// Longest error body carried into an [`AnalysisError`].
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Identification service client over HTTP.
#[derive(Clone)]
pub struct HttpIdentificationClient {
    http: Client,
    config: ServiceConfig,
}

impl HttpIdentificationClient {
    pub fn new(config: ServiceConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn image_part(side: ImageSide, image: &EncodedImage) -> Result<Part, AnalysisError> {
        Part::bytes(image.to_bytes())
            .file_name(format!("{}.{}", side.label(), image.extension()))
            .mime_str(image.media_type())
            .map_err(|e| transport(AnalysisPhase::Upload, e))
    }

    fn scan_id_from(&self, body: &str) -> Result<ScanId, AnalysisError> {
        let value: serde_json::Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "upload response is not JSON");
                return Err(AnalysisError::MissingIdentifier);
            }
        };

        let id = match value.get(&self.config.scan_id_field) {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                tracing::warn!(
                    field = %self.config.scan_id_field,
                    "upload response has no scan identifier"
                );
                return Err(AnalysisError::MissingIdentifier);
            }
        };
        Ok(ScanId::new(id))
    }
}

#[async_trait]
impl IdentificationService for HttpIdentificationClient {
    async fn submit(&self, images: &ImagePair) -> Result<ScanId, AnalysisError> {
        let (Some(front), Some(back)) = (images.front(), images.back()) else {
            return Err(AnalysisError::Transport {
                phase: AnalysisPhase::Upload,
                message: "image pair is incomplete".into(),
            });
        };

        let form = Form::new()
            .part("front_image", Self::image_part(ImageSide::Front, front)?)
            .part("back_image", Self::image_part(ImageSide::Back, back)?);

        tracing::info!(
            url = %self.config.upload_url,
            front_bytes = front.byte_len(),
            back_bytes = back.byte_len(),
            "uploading images"
        );

        let response = self
            .http
            .post(self.config.upload_url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport(AnalysisPhase::Upload, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Upload {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport(AnalysisPhase::Upload, e))?;
        let scan_id = self.scan_id_from(&body)?;
        tracing::debug!(scan_id = %scan_id, "upload accepted");
        Ok(scan_id)
    }

    async fn fetch_result(&self, scan_id: &ScanId) -> Result<IdentificationResult, AnalysisError> {
        let url = self
            .config
            .results_url_for(scan_id)
            .map_err(|e| transport(AnalysisPhase::Fetch, e))?;

        tracing::info!(url = %url, "fetching identification result");

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| transport(AnalysisPhase::Fetch, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Fetch {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport(AnalysisPhase::Fetch, e))?;
        IdentificationResult::from_json(&body)
    }
}

fn transport(phase: AnalysisPhase, err: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Transport {
        phase,
        message: err.to_string(),
    }
}

async fn error_body(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
