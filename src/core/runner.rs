use anyhow::{Context, Result};
use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use serde_json::{Map, Value};
use tokio::time::{sleep, Duration};

use crate::adapters::inference::InferenceApi;
use crate::adapters::output::ResultWriter;
use crate::core::job::*;
use crate::utils::config::{FallbackThresholds, PollSettings};
use crate::utils::encoding::safe_decode;
use crate::utils::lib::*;

/// Where the poll loop stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(StatusResponse),
    Failed { detail: String },
    TimedOut { waited: Duration },
}

/// Drives one job through submit, poll and collect.
pub struct JobRunner<T: InferenceApi> {
    api: T,
    writer: ResultWriter,
    poll: PollSettings,
    thresholds: FallbackThresholds,
}

impl<T: InferenceApi> JobRunner<T> {
    pub fn new(api: T, writer: ResultWriter) -> Self {
        Self {
            api,
            writer,
            poll: PollSettings::default(),
            thresholds: FallbackThresholds::default(),
        }
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_fallback_thresholds(mut self, thresholds: FallbackThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub async fn run(&self, request: &JobRequest) -> Result<JobOutcome> {
        info!("Sending request to RunPod API...");
        let job = self.api.submit_job(request).await
            .context("Failed to submit job")?;

        let outcome = match self.wait_for_completion(&job).await {
            PollOutcome::Completed(status_data) => JobOutcome::Completed(self.collect(&status_data)),
            PollOutcome::Failed { detail } => JobOutcome::Failed { detail },
            PollOutcome::TimedOut { waited } => JobOutcome::TimedOut { waited },
        };
        Ok(outcome)
    }

    /// Polls until the job completes, fails, or the accumulated wait reaches
    /// the ceiling. Status calls that error out are retried after the longer
    /// error interval.
    pub async fn wait_for_completion(&self, job: &JobHandle) -> PollOutcome {
        info!("Waiting for job {} to complete...", job);
        let spinner = create_spinner().unwrap_or_else(|_| ProgressBar::hidden());
        let mut waited = Duration::ZERO;

        while waited < self.poll.max_wait {
            let delay = match self.api.fetch_status(job).await {
                Ok(status_data) => {
                    let status = status_data.job_status();
                    spinner.set_message(format!("{} ({}s)", status, waited.as_secs()));
                    spinner.tick();
                    spinner.suspend(|| info!("Job status: {} (waited: {}s)", status, waited.as_secs()));

                    match status {
                        JobStatus::Completed => {
                            spinner.finish_and_clear();
                            return PollOutcome::Completed(status_data);
                        }
                        JobStatus::Failed => {
                            spinner.finish_and_clear();
                            let detail = status_data.error_detail();
                            error!("Job failed: {}", detail);
                            debug!("Full status data: {:?}", status_data);
                            return PollOutcome::Failed { detail };
                        }
                        JobStatus::Queued | JobStatus::Running => self.poll.interval,
                        JobStatus::Unknown(other) => {
                            spinner.suspend(|| warn!("Unknown status: {:?}", other));
                            self.poll.interval
                        }
                    }
                }
                Err(e) => {
                    spinner.suspend(|| warn!("Status check error: {:#}", e));
                    self.poll.error_interval
                }
            };

            if delay.is_zero() {
                warn!("Poll delay is zero, polling stopped");
                break;
            }
            sleep(delay).await;
            waited += delay;
        }

        spinner.finish_and_clear();
        if waited >= self.poll.max_wait {
            warn!("Exceeded maximum wait time ({}s)", self.poll.max_wait.as_secs());
        }
        PollOutcome::TimedOut { waited }
    }

    /// Decodes and saves whatever images a completed job returned.
    pub fn collect(&self, status_data: &StatusResponse) -> CollectReport {
        if let Some(execution_time) = &status_data.execution_time {
            info!("Job completed! Execution time: {}ms", execution_time);
        }
        match status_data.output_keys() {
            Some(keys) => info!("Output keys: {:?}", keys),
            None => info!("Output is not an object"),
        }

        match JobOutput::from_output(status_data.output.as_ref()) {
            JobOutput::Structured(items) => self.collect_structured(&items),
            JobOutput::Fallback(map) => self.collect_fallback(&map),
            JobOutput::Empty => {
                warn!("No valid output data.");
                debug!("Status data: {:?}", status_data);
                CollectReport::default()
            }
        }
    }

    fn collect_structured(&self, items: &[OutputItem]) -> CollectReport {
        info!("Found {} images", items.len());
        let mut report = CollectReport::default();

        for (i, item) in items.iter().enumerate() {
            let image = match item {
                OutputItem::Image(image) => image,
                OutputItem::Malformed(value) => {
                    warn!("✗ Image {} is not an image record: {}", i + 1, value);
                    report.skipped += 1;
                    continue;
                }
            };

            info!("Processing image {}: {}", i + 1, image.path);
            debug!("Base64 data length: {}", image.data.len());

            if image.data.is_empty() {
                warn!("✗ Image {} has no data", i + 1);
                report.skipped += 1;
                continue;
            }

            let Some(bytes) = safe_decode(&image.data).filter(|b| !b.is_empty()) else {
                warn!("✗ Failed to decode image {}", i + 1);
                report.skipped += 1;
                continue;
            };

            let file_name = structured_file_name(&timestamp(), &image.path, i + 1);
            match self.writer.write_image(&file_name, &bytes) {
                Ok(path) => report.saved.push(path),
                Err(e) => {
                    error!("✗ Image {}: {:#}", i + 1, e);
                    report.skipped += 1;
                }
            }
        }

        info!("Image processing complete: {} saved, {} skipped", report.saved.len(), report.skipped);
        report
    }

    fn collect_fallback(&self, output: &Map<String, Value>) -> CollectReport {
        info!("No 'images' key in output, scanning values for image data...");
        let mut report = CollectReport::default();

        for (key, value) in output {
            let Some(text) = value.as_str() else { continue };
            if text.len() <= self.thresholds.min_encoded_len {
                continue;
            }

            info!("Trying image data from key '{}'...", key);
            match safe_decode(text) {
                Some(bytes) if bytes.len() > self.thresholds.min_decoded_len => {
                    match self.writer.write_image(&fallback_file_name(&timestamp(), key), &bytes) {
                        Ok(path) => report.saved.push(path),
                        Err(e) => {
                            error!("✗ Key '{}': {:#}", key, e);
                            report.skipped += 1;
                        }
                    }
                }
                _ => report.skipped += 1,
            }
        }

        if report.saved.is_empty() {
            warn!("No savable images found. Output contents:");
            for (key, value) in output {
                warn!("  {}: {}", key, preview(value));
            }
        }
        report
    }
}

fn preview(value: &Value) -> String {
    match value {
        Value::String(text) if text.chars().count() > 100 => {
            format!("{}...", text.chars().take(100).collect::<String>())
        }
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
