//! Scratch files that are removed on every exit path.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::TempPath;
use tracing::{debug, warn};

/// A uniquely named temporary file, deleted when dropped.
///
/// Names look like `<prefix>_<epoch micros>_<random><extension>`. A failed
/// deletion is logged and otherwise ignored.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    temp: Option<TempPath>,
}

impl ScratchFile {
    /// Create a scratch file holding `bytes`.
    pub fn write(dir: &Path, prefix: &str, extension: &str, bytes: &[u8]) -> io::Result<Self> {
        let (mut file, scratch) = Self::create(dir, prefix, extension)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(scratch)
    }

    /// Create an empty scratch file for a later writer.
    pub fn reserve(dir: &Path, prefix: &str, extension: &str) -> io::Result<Self> {
        Self::create(dir, prefix, extension).map(|(_, scratch)| scratch)
    }

    fn create(dir: &Path, prefix: &str, extension: &str) -> io::Result<(File, Self)> {
        let stamped = format!("{}_{}_", prefix, Utc::now().timestamp_micros());
        let named = tempfile::Builder::new()
            .prefix(&stamped)
            .suffix(extension)
            .rand_bytes(8)
            .tempfile_in(dir)?;

        let (file, temp) = named.into_parts();
        let path = temp.to_path_buf();
        debug!("Created scratch file {}", path.display());

        Ok((file, Self {
            path,
            temp: Some(temp),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(temp) = self.temp.take() {
            match temp.close() {
                Ok(()) => debug!("Removed scratch file {}", self.path.display()),
                Err(e) => warn!(
                    "Failed to clean up temporary file {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_remove() {
        let dir = tempfile::tempdir().unwrap();

        let scratch = ScratchFile::write(dir.path(), "ocr", ".png", b"label").unwrap();
        let path = scratch.path().to_path_buf();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();

        assert!(name.starts_with("ocr_"));
        assert!(name.ends_with(".png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"label");

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();

        let files: Vec<ScratchFile> = (0..32)
            .map(|_| ScratchFile::reserve(dir.path(), "processed", ".png").unwrap())
            .collect();

        let mut paths: Vec<&Path> = files.iter().map(|f| f.path()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 32);
    }

    #[test]
    fn test_missing_file_on_drop_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();

        let scratch = ScratchFile::reserve(dir.path(), "ocr", ".jpg").unwrap();
        std::fs::remove_file(scratch.path()).unwrap();

        // Removal fails inside drop; that must only log.
        drop(scratch);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
