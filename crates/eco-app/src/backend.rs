mod config;
mod download;
mod feed;
mod schemas;

pub use config::{BackendConfig, DetectRoute};
pub use download::download_video;
pub use feed::LiveFeed;

use std::time::Duration;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use eco_core::{BackendError, CaptureArtifact, DetectResponse, SuggestPayload, VideoResponse, WasteBackend};
use crate::backend::schemas::{GenerateVideoRequest, SuggestRequest};

/// [`WasteBackend`] over the Flask service's JSON/multipart HTTP API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, timeout: Duration) -> Result<T, BackendError> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

pub(crate) fn transport(e: reqwest::Error) -> BackendError {
    BackendError::Transport(e.to_string())
}

#[async_trait]
impl WasteBackend for HttpBackend {
    async fn detect(&self, artifact: &CaptureArtifact) -> Result<DetectResponse, BackendError> {
        let route = self.config.detect_route;
        let part = Part::bytes(artifact.bytes().to_vec())
            .file_name(artifact.file_name().to_string())
            .mime_str(artifact.mime_type())
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let form = Form::new().part(route.field(), part);

        debug!(route = route.path(), size = artifact.len(), "uploading capture");

        let request = self.client.post(self.config.endpoint(route.path())).multipart(form);
        self.send(request, self.config.request_timeout).await
    }

    async fn suggest(&self, object: &str) -> Result<SuggestPayload, BackendError> {
        let request = self
            .client
            .post(self.config.endpoint("suggest"))
            .json(&SuggestRequest { object });
        self.send(request, self.config.request_timeout).await
    }

    async fn generate_video(&self, steps: &[String]) -> Result<VideoResponse, BackendError> {
        debug!(steps = steps.len(), "requesting instructional video");

        let request = self
            .client
            .post(self.config.endpoint("generate_video"))
            .json(&GenerateVideoRequest { steps });
        self.send(request, self.config.generate_timeout).await
    }
}
