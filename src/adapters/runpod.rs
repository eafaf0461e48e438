use super::inference::{InferenceApi, InferenceProvider, MissingJobId};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION};
use serde_json::Value;
use crate::core::job::{JobHandle, JobRequest, StatusResponse};
use crate::utils::config::Config;
use anyhow::{Context, Result};
use log::{info, debug, error};

/// Client for a RunPod serverless endpoint.
pub struct RunPod {
    client: reqwest::Client,
    config: Config,
}

impl RunPod {
    pub fn new(config: Config) -> Self {
        Self { client: reqwest::Client::new(), config }
    }
}

impl InferenceProvider for RunPod {
    fn generate_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .context("Failed to create Authorization header")?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn submit_url(&self) -> String {
        self.config.run_url()
    }

    fn status_url(&self, job: &JobHandle) -> String {
        self.config.status_url(job.as_str())
    }
}

#[async_trait]
impl InferenceApi for RunPod {
    async fn submit_job(&self, request: &JobRequest) -> Result<JobHandle> {
        let headers = self.generate_headers()?;
        let response = self.client.post(self.submit_url())
            .headers(headers)
            .json(request)
            .send()
            .await
            .context("Failed to send job to RunPod")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            error!("RunPod API request failed: {}", status.as_u16());
            anyhow::bail!("RunPod API request failed ({}): {}", status.as_u16(), error_text)
        }

        let run_data = response.json::<Value>().await
            .context("Failed to parse RunPod run response as JSON")?;
        debug!("API response: {}", run_data);

        let job_id = match run_data.get("id").and_then(Value::as_str).filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                error!("No job ID in RunPod response");
                return Err(MissingJobId { response: run_data.to_string() }.into());
            }
        };

        info!("Job started. Job ID: {}", job_id);
        Ok(JobHandle(job_id.to_string()))
    }

    async fn fetch_status(&self, job: &JobHandle) -> Result<StatusResponse> {
        let headers = self.generate_headers()?;
        let response = self.client.get(self.status_url(job))
            .headers(headers)
            .send()
            .await
            .context("Failed to reach RunPod status endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            anyhow::bail!("Status check error ({}): {}", status.as_u16(), error_text)
        }

        let status_data = response.json::<StatusResponse>().await
            .context("Failed to parse RunPod status response as JSON")?;
        debug!("Status response: {:?}", status_data);
        Ok(status_data)
    }
}
