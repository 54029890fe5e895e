pub mod archive;
pub mod expander;
pub mod jsonschema;
pub mod paths;
pub mod pool;
pub mod selector;
pub mod service;
pub mod types;
pub mod workers;
pub mod writer;

pub use paths::JsonPaths;
pub use pool::WorkerPool;
pub use selector::{EntitySelector, ExportSelectors};
pub use service::ExportTask;
pub use types::{ExportObjectTypeInput, ExportObjectsInput, ExportOutcome, ItemError, PoolReport};
