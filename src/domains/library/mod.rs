pub mod repository;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use repository::{with_read_txn, LibraryReader, LibraryStore, Owner, RowSource, SqliteLibrary};
pub use types::*;
