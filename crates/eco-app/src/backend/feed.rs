use std::time::Duration;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tracing::{debug, info};
use eco_core::mjpeg::FEED_BOUNDARY;
use eco_core::{BackendError, MjpegFrames};
use crate::backend::{transport, BackendConfig};
use crate::error::AppError;

/// Control and stream access for the backend's server-side camera.
#[derive(Debug, Clone)]
pub struct LiveFeed {
    client: Client,
    config: BackendConfig,
}

impl LiveFeed {
    pub fn new(client: Client, config: BackendConfig) -> Self {
        Self { client, config }
    }

    pub async fn start(&self) -> Result<(), AppError> {
        self.control("start").await?;
        info!("live feed started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), AppError> {
        self.control("stop").await?;
        info!("live feed stopped");
        Ok(())
    }

    async fn control(&self, action: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.config.endpoint(action))
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(transport)?;

        ensure_success(response).await.map(|_| ())
    }

    /// Streams JPEG frames from `/video_feed` until the server closes it.
    pub async fn frames(&self) -> Result<BoxStream<'static, Result<Vec<u8>, AppError>>, AppError> {
        let response = self
            .client
            .get(self.config.endpoint("video_feed"))
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response).await?;

        let parser = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(MjpegFrames::from_content_type)
            .unwrap_or_else(|| MjpegFrames::new(FEED_BOUNDARY));

        let chunks = response.bytes_stream().boxed();

        let frames = stream::unfold(Some((chunks, parser)), |state| async move {
            let (mut chunks, mut parser) = state?;
            loop {
                if let Some(frame) = parser.next_frame() {
                    return Some((Ok(frame), Some((chunks, parser))));
                }

                match chunks.next().await {
                    Some(Ok(bytes)) => parser.push(&bytes),
                    Some(Err(e)) => return Some((Err(AppError::Feed(e.to_string())), None)),
                    None => {
                        debug!(leftover = parser.buffered(), "live feed closed");
                        return None;
                    }
                }
            }
        });

        Ok(frames.boxed())
    }

    /// Grabs a single frame, giving up after `timeout`.
    pub async fn next_frame(&self, timeout: Duration) -> Result<Vec<u8>, AppError> {
        tokio::time::timeout(timeout, self.first_frame())
            .await
            .map_err(|_| AppError::Feed("timed out waiting for a camera frame".into()))?
    }

    async fn first_frame(&self) -> Result<Vec<u8>, AppError> {
        let mut frames = self.frames().await?;
        frames
            .next()
            .await
            .unwrap_or_else(|| Err(AppError::Feed("stream ended before a frame arrived".into())))
    }
}

async fn ensure_success(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    }
    .into())
}
