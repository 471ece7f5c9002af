//! gRPC inference client.
//!
//! One synchronous-per-frame call: the session awaits each `ProcessImages`
//! to completion before fetching the next frame. Transient failures are
//! absorbed by a bounded exponential-backoff retry; a locally enforced
//! deadline covers servers that never answer.

use tonic::transport::Channel;
use tracing::{debug, warn};

use lookout_proto::detector_client::DetectorClient;
use lookout_proto::ProcessImagesRequest;

use crate::config::ClientConfig;
use crate::detections::Detections;
use crate::encode::EncodedFrame;
use crate::error::InferenceError;

/// Seam for the session loop; lets tests drive the pipeline without a
/// network.
#[tonic::async_trait]
pub trait Infer {
    /// Run inference on a batch of encoded frames. The result is
    /// index-aligned with the input and has identical cardinality.
    async fn infer(&mut self, frames: Vec<EncodedFrame>) -> Result<Vec<Detections>, InferenceError>;
}

/// tonic-backed detector client.
pub struct InferenceClient {
    inner: DetectorClient<Channel>,
    config: ClientConfig,
}

impl InferenceClient {
    /// Establishes the channel to the configured endpoint.
    pub async fn connect(config: ClientConfig) -> Result<Self, InferenceError> {
        let uri = normalize_endpoint(&config.endpoint);
        let endpoint =
            Channel::from_shared(uri).map_err(|e| InferenceError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: e.to_string(),
            })?;
        let channel = endpoint.connect().await?;

        debug!("Connected to detector at {}", config.endpoint);

        Ok(Self {
            inner: DetectorClient::new(channel),
            config,
        })
    }

    async fn call_once(
        &mut self,
        images: Vec<Vec<u8>>,
    ) -> Result<Vec<lookout_proto::DetectionResult>, InferenceError> {
        let request = ProcessImagesRequest { images };
        let response = tokio::time::timeout(
            self.config.request_timeout,
            self.inner.process_images(request),
        )
        .await
        .map_err(|_| InferenceError::Timeout(self.config.request_timeout))??;

        Ok(response.into_inner().results)
    }
}

#[tonic::async_trait]
impl Infer for InferenceClient {
    async fn infer(&mut self, frames: Vec<EncodedFrame>) -> Result<Vec<Detections>, InferenceError> {
        let images: Vec<Vec<u8>> = frames.into_iter().map(|f| f.bytes).collect();
        let expected = images.len();
        let retry = self.config.retry;

        let mut attempt = 1;
        let results = loop {
            match self.call_once(images.clone()).await {
                Ok(results) => break results,
                Err(e) if e.is_retryable() && attempt < retry.max_attempts => {
                    let backoff = retry.backoff_after(attempt);
                    warn!(
                        "Inference attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, retry.max_attempts, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        if results.len() != expected {
            return Err(InferenceError::ResultCountMismatch {
                expected,
                actual: results.len(),
            });
        }

        Ok(results.into_iter().map(Detections::from_proto).collect())
    }
}

/// tonic requires an explicit scheme.
fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_scheme_normalization() {
        assert_eq!(normalize_endpoint("localhost:50051"), "http://localhost:50051");
        assert_eq!(normalize_endpoint("http://a:1"), "http://a:1");
        assert_eq!(normalize_endpoint("https://a:1"), "https://a:1");
    }
}
