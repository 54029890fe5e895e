use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::ExportConfig;
use crate::domains::download::DownloadRegistry;
use crate::domains::library::{with_read_txn, LibraryStore};
use crate::errors::{ServiceError, ServiceResult};
use crate::types::{EntityKind, HashAlgorithm};

use super::archive;
use super::expander;
use super::paths::JsonPaths;
use super::pool::WorkerPool;
use super::selector::ExportSelectors;
use super::types::{ExportObjectsInput, ExportOutcome, PoolReport};
use super::workers::{export_kind, ExportContext};
use super::writer::DocumentWriter;

/// One export run, either partial (zipped and registered for download) or
/// full (written in place to the metadata directory).
pub struct ExportTask {
    store: Arc<dyn LibraryStore>,
    downloads: Arc<dyn DownloadRegistry>,
    config: ExportConfig,
    hash_algorithm: HashAlgorithm,
    selectors: Arc<ExportSelectors>,
    full: bool,
    include_dependencies: bool,
}

/// Where documents are written. A temporary root is removed on drop.
enum OutputRoot {
    Permanent(PathBuf),
    Temporary(TempDir),
}

impl OutputRoot {
    fn path(&self) -> PathBuf {
        match self {
            OutputRoot::Permanent(p) => p.clone(),
            OutputRoot::Temporary(t) => t.path().to_path_buf(),
        }
    }
}

impl ExportTask {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        downloads: Arc<dyn DownloadRegistry>,
        config: ExportConfig,
        hash_algorithm: HashAlgorithm,
        input: &ExportObjectsInput,
    ) -> Self {
        Self {
            store,
            downloads,
            config,
            hash_algorithm,
            selectors: Arc::new(ExportSelectors::from_input(input)),
            full: false,
            include_dependencies: input.include_dependencies.unwrap_or(false),
        }
    }

    /// Export every row of every type to the metadata directory
    pub fn full(
        store: Arc<dyn LibraryStore>,
        downloads: Arc<dyn DownloadRegistry>,
        config: ExportConfig,
        hash_algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            full: true,
            ..Self::new(store, downloads, config, hash_algorithm, &ExportObjectsInput::default())
        }
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    fn output_root(&self) -> ServiceResult<OutputRoot> {
        if self.full {
            let path = self.config.metadata_path();
            if path.as_os_str().is_empty() {
                return Err(ServiceError::Configuration("metadata path must not be empty".to_string()));
            }
            return Ok(OutputRoot::Permanent(path.to_path_buf()));
        }

        let parent = self.config.temp_dir();
        std::fs::create_dir_all(&parent).map_err(|e| {
            ServiceError::Configuration(format!("error creating {}: {}", parent.display(), e))
        })?;
        let dir = tempfile::Builder::new()
            .prefix("export")
            .tempdir_in(&parent)
            .map_err(|e| {
                ServiceError::Configuration(format!("error creating temporary directory for export: {}", e))
            })?;
        Ok(OutputRoot::Temporary(dir))
    }

    pub async fn run(&self) -> ServiceResult<ExportOutcome> {
        let task_id = Uuid::new_v4();
        let start = Instant::now();
        let workers = self.config.worker_count();

        log::info!(
            "starting {} export {} with {} workers",
            if self.full { "full" } else { "partial" },
            task_id,
            workers
        );

        let root = self.output_root().map_err(|e| {
            log::error!("{}", e);
            e
        })?;
        let paths = JsonPaths::new(root.path());

        paths
            .empty_dirs()
            .and_then(|_| paths.ensure_dirs())
            .map_err(|e| {
                let e = ServiceError::Configuration(format!("error preparing {}: {}", paths.root().display(), e));
                log::error!("{}", e);
                e
            })?;

        let reports = self.export_in_txn(&paths, workers).await.map_err(|e| {
            log::warn!("error while running export transaction: {}", e);
            e
        })?;

        let download_hash = if self.full {
            None
        } else {
            Some(self.generate_download(&paths).await.map_err(|e| {
                log::error!("error generating download link: {}", e);
                e
            })?)
        };

        let duration = start.elapsed();
        for report in &reports {
            log::debug!(
                "[{}] {} resolved, {} written, {} failed",
                report.kind,
                report.resolved,
                report.written,
                report.failed
            );
        }
        log::info!("Export complete in {:?}.", duration);

        // a temporary root is removed here
        let output_root = root.path();
        drop(root);

        Ok(ExportOutcome {
            task_id,
            download_hash,
            output_root,
            reports,
            duration,
        })
    }

    async fn export_in_txn(&self, paths: &JsonPaths, workers: usize) -> ServiceResult<Vec<PoolReport>> {
        let pool = WorkerPool::new(workers);

        with_read_txn(&*self.store, |reader| async move {
            expander::expand(&self.selectors, &*reader, self.full, self.include_dependencies).await;

            let ctx = Arc::new(ExportContext {
                reader,
                selectors: self.selectors.clone(),
                paths: paths.clone(),
                writer: DocumentWriter,
                include_dependencies: self.include_dependencies,
                hash_algorithm: self.hash_algorithm,
            });

            let mut reports = Vec::with_capacity(EntityKind::EXPORT_ORDER.len());
            for kind in EntityKind::EXPORT_ORDER {
                reports.push(export_kind(&ctx, pool, kind, self.full).await);
            }
            reports
        })
        .await
        .map_err(|e| ServiceError::Transaction(e.to_string()))
    }

    async fn generate_download(&self, paths: &JsonPaths) -> ServiceResult<String> {
        let downloads = self.config.downloads_dir();
        std::fs::create_dir_all(&downloads)
            .map_err(|e| ServiceError::Archive(format!("error creating {}: {}", downloads.display(), e)))?;

        let file = tempfile::Builder::new()
            .prefix("export")
            .suffix(".zip")
            .tempfile_in(&downloads)
            .map_err(|e| ServiceError::Archive(format!("error creating archive: {}", e)))?;
        let (file, zip_path) = file
            .keep()
            .map_err(|e| ServiceError::Archive(format!("error keeping archive: {}", e)))?;

        let (_, summary) = match archive::pack(paths, file) {
            Ok(packed) => packed,
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(&zip_path) {
                    log::warn!("error removing {}: {}", zip_path.display(), rm);
                }
                return Err(ServiceError::Archive(e.to_string()));
            }
        };

        let handle = self
            .downloads
            .register_file(&zip_path, "application/zip", false)
            .await
            .map_err(|e| ServiceError::DownloadRegistration(e.to_string()))?;

        log::debug!(
            "Generated zip file {} with hash {} ({} entries, {} skipped)",
            zip_path.display(),
            handle,
            summary.entries,
            summary.skipped_entries
        );
        Ok(handle)
    }
}
