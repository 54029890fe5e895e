// Public modules
pub mod config;
pub mod db_migration;
pub mod domains;
pub mod errors;
pub mod types;

pub use config::ExportConfig;
pub use domains::{DownloadRegistry, ExportObjectsInput, ExportOutcome, ExportTask, LibraryStore, LocalDownloadStore, SqliteLibrary};
pub use errors::{DbError, DomainError, ServiceError};
pub use types::{EntityKind, HashAlgorithm};

/// Install the global logger.
///
/// Honours `RUST_LOG` when set, otherwise logs at debug in debug builds and
/// info in release builds. Safe to call more than once.
pub fn init_logging() {
    if std::env::var_os("RUST_LOG").is_none() {
        let level = if cfg!(debug_assertions) { "debug" } else { "info" };
        std::env::set_var("RUST_LOG", level);
    }
    let _ = env_logger::try_init();
}
