use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use log::{info, debug};

use crate::core::job::{ImagePayload, JobRequest};
use crate::utils::encoding::encode;

pub const WORKFLOW_FILE: &str = "input.json";

/// Images the inpainting workflow expects, in submission order: the
/// garment or texture to paint in, the reference being painted, and the
/// mask selecting which part of the reference is replaced.
pub const IMAGE_FILES: [&str; 3] = ["input-1.png", "input-2.png", "mask.png"];

pub struct FileInputAdapter {
    input_folder: PathBuf,
}

impl FileInputAdapter {
    pub fn new(input_folder: PathBuf) -> Self {
        info!("Creating new FileInputAdapter with input folder: {:?}", input_folder);
        Self { input_folder }
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_of(name);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!("Read {} bytes from {:?}", bytes.len(), path);
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => bail!("File not found: {}", path.display()),
            Err(e) => Err(e).with_context(|| format!("Failed to read file: {}", path.display())),
        }
    }

    pub fn load_workflow(&self) -> Result<Value> {
        let bytes = self.read_file(WORKFLOW_FILE)?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("JSON parse error in {}", self.path_of(WORKFLOW_FILE).display()))
    }

    /// Reads and base64-encodes every required image, preserving order.
    pub fn load_images(&self) -> Result<Vec<ImagePayload>> {
        IMAGE_FILES
            .iter()
            .map(|name| {
                let bytes = self.read_file(name)?;
                Ok(ImagePayload { name: name.to_string(), image: encode(&bytes) })
            })
            .collect()
    }

    /// Loads every input and assembles the submit body. Nothing is sent if
    /// any file is missing or the workflow is not valid JSON.
    pub fn build_request(&self) -> Result<JobRequest> {
        info!("Loading workflow and image files...");
        let workflow = self.load_workflow()?;
        info!("Encoding image files to Base64...");
        let images = self.load_images()?;
        Ok(JobRequest::new(workflow, images))
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.input_folder.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::encoding::safe_decode;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_inputs(dir: &Path) {
        fs::write(dir.join(WORKFLOW_FILE), r#"{"10": {"class_type": "LoadImage", "inputs": {"image": "mask.png"}}}"#).unwrap();
        fs::write(dir.join("input-1.png"), [0x89, b'P', b'N', b'G', 1, 2, 3]).unwrap();
        fs::write(dir.join("input-2.png"), [0u8, 0, 0, 255]).unwrap();
        fs::write(dir.join("mask.png"), b"mask-bytes").unwrap();
    }

    #[test]
    fn builds_request_with_three_encoded_images() {
        let dir = TempDir::new().unwrap();
        write_inputs(dir.path());

        let request = FileInputAdapter::new(dir.path().to_path_buf()).build_request().unwrap();

        assert_eq!(request.input.workflow["10"]["class_type"], json!("LoadImage"));
        let names: Vec<&str> = request.input.images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, IMAGE_FILES.to_vec());
        for payload in &request.input.images {
            let original = fs::read(dir.path().join(&payload.name)).unwrap();
            assert_eq!(safe_decode(&payload.image).unwrap(), original);
        }
    }

    #[test]
    fn missing_image_aborts() {
        let dir = TempDir::new().unwrap();
        write_inputs(dir.path());
        fs::remove_file(dir.path().join("mask.png")).unwrap();

        let err = FileInputAdapter::new(dir.path().to_path_buf()).build_request().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("File not found"));
        assert!(message.contains("mask.png"));
    }

    #[test]
    fn malformed_workflow_aborts() {
        let dir = TempDir::new().unwrap();
        write_inputs(dir.path());
        fs::write(dir.path().join(WORKFLOW_FILE), "{ not json").unwrap();

        let err = FileInputAdapter::new(dir.path().to_path_buf()).build_request().unwrap_err();
        assert!(err.to_string().contains("JSON parse error"));
    }
}
