use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;

use crate::error::SentimentError;
use crate::models::{AnalysisRequest, AnalysisResult};

use super::EndpointList;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can turn text into an [`AnalysisResult`].
#[async_trait]
pub trait SentimentService: Send + Sync {
    async fn resolve(&self, text: &str) -> Result<AnalysisResult, SentimentError>;
}

/// Tries each endpoint once, in order, and returns the first success.
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    client: reqwest::Client,
    endpoints: EndpointList,
}

impl EndpointResolver {
    pub fn new(endpoints: EndpointList, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sentilens/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to initialize sentiment HTTP client")?;

        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &EndpointList {
        &self.endpoints
    }

    async fn attempt(&self, url: &str, text: &str) -> Result<AnalysisResult> {
        let response = self
            .client
            .post(url)
            .json(&AnalysisRequest::new(text))
            .send()
            .await
            .map_err(|err| anyhow!("request failed: {err}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("endpoint answered {status}");
        }

        response
            .json::<AnalysisResult>()
            .await
            .map_err(|err| anyhow!("unreadable response body: {err}"))
    }
}

#[async_trait]
impl SentimentService for EndpointResolver {
    async fn resolve(&self, text: &str) -> Result<AnalysisResult, SentimentError> {
        for (index, url) in self.endpoints.iter().enumerate() {
            match self.attempt(url, text).await {
                Ok(result) => {
                    log_info!("sentiment resolved by endpoint #{} ({})", index + 1, url);
                    return Ok(result);
                }
                Err(err) => {
                    log_warn!("endpoint #{} ({}) failed: {err:#}", index + 1, url);
                }
            }
        }

        Err(SentimentError::ServiceUnreachable {
            attempts: self.endpoints.len(),
        })
    }
}
