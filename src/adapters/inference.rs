use async_trait::async_trait;
use reqwest::header::HeaderMap;
use anyhow::Result;
use std::fmt;
#[cfg(test)]
use mockall::automock;

use crate::core::job::{JobHandle, JobRequest, StatusResponse};

/// The submit call succeeded but the response carried no job identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingJobId {
    pub response: String,
}

impl fmt::Display for MissingJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunPod did not return a job ID. Full response: {}", self.response)
    }
}

impl std::error::Error for MissingJobId {}

pub trait InferenceProvider: InferenceApi {
    fn generate_headers(&self) -> Result<HeaderMap>;
    fn submit_url(&self) -> String;
    fn status_url(&self, job: &JobHandle) -> String;
}

/// The two calls a job runner makes against an asynchronous inference endpoint.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InferenceApi {
    /// Queues a job. Fails on transport errors, non-success statuses, or a
    /// response without a job identifier.
    async fn submit_job(&self, request: &JobRequest) -> Result<JobHandle>;

    /// Fetches the current status payload of a job.
    async fn fetch_status(&self, job: &JobHandle) -> Result<StatusResponse>;
}
