use std::path::{Path, PathBuf};

use crate::errors::{ServiceError, ServiceResult};

/// Used when the host cannot report its parallelism
const FALLBACK_WORKER_COUNT: usize = 4;

/// Filesystem layout and sizing for export tasks
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Permanent metadata location written by full exports
    pub metadata_path: PathBuf,
    /// Root for generated content (temporary trees, downloadable archives)
    pub generated_path: PathBuf,
    /// Fixed worker count override; `None` means available parallelism
    pub workers: Option<usize>,
}

impl ExportConfig {
    pub fn new(metadata_path: impl Into<PathBuf>, generated_path: impl Into<PathBuf>) -> Self {
        Self {
            metadata_path: metadata_path.into(),
            generated_path: generated_path.into(),
            workers: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Load from the environment (and `.env` if present).
    ///
    /// `METADATA_PATH` and `GENERATED_PATH` are required, `EXPORT_WORKERS` is optional.
    pub fn from_env() -> ServiceResult<Self> {
        dotenv::dotenv().ok();

        let metadata_path = std::env::var("METADATA_PATH")
            .map_err(|_| ServiceError::Configuration("METADATA_PATH is not set".to_string()))?;
        let generated_path = std::env::var("GENERATED_PATH")
            .map_err(|_| ServiceError::Configuration("GENERATED_PATH is not set".to_string()))?;

        let mut config = Self::new(metadata_path, generated_path);

        if let Ok(raw) = std::env::var("EXPORT_WORKERS") {
            let workers = raw.trim().parse::<usize>().map_err(|e| {
                ServiceError::Configuration(format!("EXPORT_WORKERS must be a positive integer: {}", e))
            })?;
            config = config.with_workers(workers);
        }

        Ok(config)
    }

    /// Directory holding per-export temporary trees
    pub fn temp_dir(&self) -> PathBuf {
        self.generated_path.join("tmp")
    }

    /// Directory holding archives registered for download
    pub fn downloads_dir(&self) -> PathBuf {
        self.generated_path.join("downloads")
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Worker count for every pool of one task, read once at task start
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(FALLBACK_WORKER_COUNT)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_paths() {
        let config = ExportConfig::new("/data/metadata", "/data/generated");
        assert_eq!(config.temp_dir(), PathBuf::from("/data/generated/tmp"));
        assert_eq!(config.downloads_dir(), PathBuf::from("/data/generated/downloads"));
    }

    #[test]
    fn test_worker_count() {
        let config = ExportConfig::new("m", "g");
        assert!(config.worker_count() >= 1);

        let config = config.with_workers(0);
        assert_eq!(config.worker_count(), 1);
        assert_eq!(ExportConfig::new("m", "g").with_workers(3).worker_count(), 3);
    }
}
