pub mod service;
pub mod types;

pub use service::{DownloadRegistry, LocalDownloadStore};
pub use types::DownloadEntry;
