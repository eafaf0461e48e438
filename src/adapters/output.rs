use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use log::info;

/// Writes decoded images into the results directory.
pub struct ResultWriter {
    dir: PathBuf,
}

impl ResultWriter {
    /// Creates the directory when it does not exist yet.
    pub fn create(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create results directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn write_image(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(file_name);
        let mut file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        file.write_all(bytes)
            .with_context(|| format!("Failed to write image to {}", path.display()))?;
        info!("✓ Image saved: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_nested_directory_and_writes() {
        let root = TempDir::new().unwrap();
        let writer = ResultWriter::create(root.path().join("a/b/results")).unwrap();

        let path = writer.write_image("20240101_000000_out_1.png", b"pixels").unwrap();

        assert_eq!(path, root.path().join("a/b/results/20240101_000000_out_1.png"));
        assert_eq!(fs::read(path).unwrap(), b"pixels");
    }
}
