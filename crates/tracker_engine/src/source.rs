use std::time::Duration;

use reqwest::{Client, Response, Url};
use tracker_core::RawSnapshot;
use tracker_logging::{tracker_debug, tracker_warn};

use crate::decode::{decode_batch, decode_snapshot};
use crate::{FailureKind, SourceError};

#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Root the `operations` endpoints hang off, e.g. `http://host:8181/api`.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8181/api".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Backend endpoints the tracker observes and commands.
#[async_trait::async_trait]
pub trait ProgressSource: Send + Sync {
    /// `GET /operations`
    async fn list_operations(&self) -> Result<Vec<RawSnapshot>, SourceError>;

    /// `GET /operations/{id}`
    async fn get_operation(&self, id: &str) -> Result<RawSnapshot, SourceError>;

    /// `POST /operations/{id}/stop`
    async fn stop_operation(&self, id: &str) -> Result<(), SourceError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestProgressSource {
    client: Client,
    base_url: Url,
}

impl ReqwestProgressSource {
    pub fn new(settings: SourceSettings) -> Result<Self, SourceError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| SourceError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(SourceError::new(
                FailureKind::InvalidUrl,
                format!("{base_url} cannot carry a path"),
            ));
        }

        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| SourceError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read_success(&self, response: Response) -> Result<Vec<u8>, SourceError> {
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(body.to_vec())
    }
}

#[async_trait::async_trait]
impl ProgressSource for ReqwestProgressSource {
    async fn list_operations(&self) -> Result<Vec<RawSnapshot>, SourceError> {
        let url = self.endpoint(&["operations"]);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body = self.read_success(response).await?;
        let batch = decode_batch(&body)?;
        if batch.skipped > 0 {
            tracker_warn!("Skipped {} malformed operation entries", batch.skipped);
        }
        tracker_debug!("Fetched {} operation snapshots", batch.snapshots.len());
        Ok(batch.snapshots)
    }

    async fn get_operation(&self, id: &str) -> Result<RawSnapshot, SourceError> {
        let url = self.endpoint(&["operations", id]);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body = self.read_success(response).await?;
        decode_snapshot(&body)
    }

    async fn stop_operation(&self, id: &str) -> Result<(), SourceError> {
        let url = self.endpoint(&["operations", id, "stop"]);
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body = self.read_success(response).await?;

        // An explicit `"success": false` body is a refusal even on 2xx.
        if let Ok(serde_json::Value::Object(ack)) = serde_json::from_slice(&body) {
            if ack.get("success").and_then(serde_json::Value::as_bool) == Some(false) {
                let reason = ack
                    .get("message")
                    .or_else(|| ack.get("error"))
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("stop refused");
                return Err(SourceError::new(FailureKind::Rejected, reason));
            }
        }
        Ok(())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        return SourceError::new(FailureKind::Timeout, err.to_string());
    }
    SourceError::new(FailureKind::Network, err.to_string())
}
