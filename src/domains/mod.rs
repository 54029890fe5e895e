pub mod download;
pub mod export;
pub mod library;

pub use download::{DownloadRegistry, LocalDownloadStore};
pub use export::{ExportObjectsInput, ExportOutcome, ExportTask};
pub use library::{LibraryStore, SqliteLibrary};
