use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::AppError;

pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_json<T: Serialize>(&self, file_name: &str, report: &T) -> Result<PathBuf, AppError> {
        let body = serde_json::to_string_pretty(report)?;
        self.write(file_name, &body)
    }

    pub fn write_markdown(&self, file_name: &str, body: &str) -> Result<PathBuf, AppError> {
        self.write(file_name, body)
    }

    fn write(&self, file_name: &str, body: &str) -> Result<PathBuf, AppError> {
        if file_name.contains(['/', '\\']) {
            return Err(AppError::Report(format!(
                "Report name must be a plain file name: {}",
                file_name
            )));
        }

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        fs::write(&path, body)?;
        info!("Report written to {}", path.display());
        Ok(path)
    }
}
