use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use tokio::time::Duration;

/// Body of the submit call: `{ "input": { "workflow": ..., "images": [...] } }`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub input: JobInput,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobInput {
    pub workflow: Value,
    pub images: Vec<ImagePayload>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub name: String,
    pub image: String,
}

impl JobRequest {
    pub fn new(workflow: Value, images: Vec<ImagePayload>) -> Self {
        Self { input: JobInput { workflow, images } }
    }
}

/// Identifier the worker hands back for a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(pub String);

impl JobHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Unknown(String),
}

impl From<&str> for JobStatus {
    fn from(status: &str) -> Self {
        match status {
            "IN_QUEUE" => JobStatus::Queued,
            "IN_PROGRESS" => JobStatus::Running,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" => JobStatus::Failed,
            other => JobStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => f.write_str("IN_QUEUE"),
            JobStatus::Running => f.write_str("IN_PROGRESS"),
            JobStatus::Completed => f.write_str("COMPLETED"),
            JobStatus::Failed => f.write_str("FAILED"),
            JobStatus::Unknown(other) => f.write_str(other),
        }
    }
}

/// Payload of the status endpoint. Everything except `status` is optional.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub execution_time: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl StatusResponse {
    pub fn job_status(&self) -> JobStatus {
        JobStatus::from(self.status.as_deref().unwrap_or(""))
    }

    /// Keys of `output` when it is a JSON object.
    pub fn output_keys(&self) -> Option<Vec<&str>> {
        self.output
            .as_ref()
            .and_then(Value::as_object)
            .map(|map| map.keys().map(String::as_str).collect())
    }

    pub fn error_detail(&self) -> String {
        match &self.error {
            Some(Value::String(detail)) => detail.clone(),
            Some(Value::Null) | None => "unknown error".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// One entry of the worker's `images` list.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputImage {
    pub path: String,
    pub data: String,
}

/// A slot of the `images` list, kept positional so file indices match the worker's.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    Image(OutputImage),
    Malformed(Value),
}

/// Shape of a completed job's `output`, resolved once.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutput {
    Structured(Vec<OutputItem>),
    Fallback(Map<String, Value>),
    Empty,
}

impl JobOutput {
    pub fn from_output(output: Option<&Value>) -> Self {
        let map = match output {
            Some(Value::Object(map)) if !map.is_empty() => map,
            _ => return JobOutput::Empty,
        };

        match map.get("images") {
            Some(images) => {
                let items = images.as_array().map(Vec::as_slice).unwrap_or_default();
                JobOutput::Structured(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| OutputItem::from_value(i, item))
                        .collect(),
                )
            }
            None => JobOutput::Fallback(map.clone()),
        }
    }
}

impl OutputItem {
    fn from_value(index: usize, item: &Value) -> Self {
        match item.as_object() {
            Some(record) => OutputItem::Image(OutputImage {
                path: record
                    .get("path")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("output_{}.png", index)),
                data: record
                    .get("data")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            None => OutputItem::Malformed(item.clone()),
        }
    }
}

/// What output collection achieved for a completed job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectReport {
    pub saved: Vec<PathBuf>,
    pub skipped: usize,
}

/// Terminal result of one run.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(CollectReport),
    Failed { detail: String },
    TimedOut { waited: Duration },
}
