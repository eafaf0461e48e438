use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::time::Duration;

use chrono::Local;

use crate::utils::config::*;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding input.json, input-1.png, input-2.png and mask.png
    #[clap(short, long, value_parser, default_value = ".")]
    pub workdir: PathBuf,

    /// Where decoded images are written; relative paths resolve under the workdir
    #[clap(short, long, value_parser, default_value = "results")]
    pub results_dir: PathBuf,

    #[clap(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Seconds between status checks while the job is queued or running
    #[clap(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: u64,

    /// Seconds to wait after a failed status check
    #[clap(long, default_value_t = DEFAULT_ERROR_INTERVAL_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub error_interval: u64,

    /// Give up after this many seconds of waiting
    #[clap(long, default_value_t = DEFAULT_MAX_WAIT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_wait: u64,

    #[clap(long, default_value_t = DEFAULT_MIN_ENCODED_LEN)]
    pub min_encoded_len: usize,

    #[clap(long, default_value_t = DEFAULT_MIN_DECODED_LEN)]
    pub min_decoded_len: usize,
}

impl Args {
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval),
            error_interval: Duration::from_secs(self.error_interval),
            max_wait: Duration::from_secs(self.max_wait),
        }
    }

    pub fn fallback_thresholds(&self) -> FallbackThresholds {
        FallbackThresholds {
            min_encoded_len: self.min_encoded_len,
            min_decoded_len: self.min_decoded_len,
        }
    }

    pub fn resolved_results_dir(&self) -> PathBuf {
        if self.results_dir.is_absolute() {
            self.results_dir.clone()
        } else {
            self.workdir.join(&self.results_dir)
        }
    }
}

pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `<timestamp>_<stem>_<index><ext>` where stem and ext come from the last
/// component of the worker's path hint. `index` is 1-based.
pub fn structured_file_name(timestamp: &str, path_hint: &str, index: usize) -> String {
    let file_name = Path::new(path_hint)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_path = Path::new(&file_name);

    let stem = file_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_else(|| ".png".to_string());

    format!("{}_{}_{}{}", timestamp, stem, index, ext)
}

pub fn fallback_file_name(timestamp: &str, key: &str) -> String {
    format!("{}_{}.png", timestamp, key)
}

pub fn create_spinner() -> Result<ProgressBar, io::Error> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?,
    );
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_name_keeps_extension() {
        assert_eq!(
            structured_file_name("20240101_120000", "/comfyui/output/ComfyUI_00001_.webp", 2),
            "20240101_120000_ComfyUI_00001__2.webp"
        );
    }

    #[test]
    fn structured_name_defaults_to_png() {
        assert_eq!(
            structured_file_name("20240101_120000", "outputs/inpainted", 1),
            "20240101_120000_inpainted_1.png"
        );
    }

    #[test]
    fn fallback_name_uses_key() {
        assert_eq!(fallback_file_name("20240101_120000", "message"), "20240101_120000_message.png");
    }

    #[test]
    fn timestamp_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
    }

    #[test]
    fn results_dir_resolves_under_workdir() {
        let args = Args::parse_from(["inpaint-runner", "--workdir", "/tmp/job"]);
        assert_eq!(args.resolved_results_dir(), PathBuf::from("/tmp/job/results"));
        assert_eq!(args.poll_settings(), PollSettings::default());
        assert_eq!(args.fallback_thresholds(), FallbackThresholds::default());
    }

    #[test]
    fn zero_delays_are_rejected() {
        for flag in ["--poll-interval", "--error-interval", "--max-wait"] {
            let parsed = Args::try_parse_from(["inpaint-runner", flag, "0"]);
            assert!(parsed.is_err(), "{} accepted 0", flag);
        }
        let args = Args::try_parse_from(["inpaint-runner", "--poll-interval", "1", "--error-interval", "2"]).unwrap();
        assert_eq!(args.poll_settings().interval, Duration::from_secs(1));
        assert_eq!(args.poll_settings().error_interval, Duration::from_secs(2));
    }
}
