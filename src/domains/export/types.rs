use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::{DbError, DomainError};
use crate::types::{EntityId, EntityKind};

/// Caller input for one entity type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportObjectTypeInput {
    #[serde(default)]
    pub ids: Vec<String>,
    pub all: Option<bool>,
}

impl ExportObjectTypeInput {
    pub fn all() -> Self {
        Self { ids: Vec::new(), all: Some(true) }
    }

    pub fn ids<I: IntoIterator<Item = EntityId>>(ids: I) -> Self {
        Self {
            ids: ids.into_iter().map(|id| id.to_string()).collect(),
            all: None,
        }
    }
}

/// Caller input for a partial export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportObjectsInput {
    pub scenes: Option<ExportObjectTypeInput>,
    pub images: Option<ExportObjectTypeInput>,
    pub studios: Option<ExportObjectTypeInput>,
    pub performers: Option<ExportObjectTypeInput>,
    pub tags: Option<ExportObjectTypeInput>,
    pub movies: Option<ExportObjectTypeInput>,
    pub galleries: Option<ExportObjectTypeInput>,
    pub include_dependencies: Option<bool>,
}

impl ExportObjectsInput {
    pub fn for_kind(&self, kind: EntityKind) -> Option<&ExportObjectTypeInput> {
        match kind {
            EntityKind::Scene => self.scenes.as_ref(),
            EntityKind::Image => self.images.as_ref(),
            EntityKind::Gallery => self.galleries.as_ref(),
            EntityKind::Movie => self.movies.as_ref(),
            EntityKind::Performer => self.performers.as_ref(),
            EntityKind::Studio => self.studios.as_ref(),
            EntityKind::Tag => self.tags.as_ref(),
        }
    }
}

/// Why a single item was skipped
#[derive(Debug, Clone, Error)]
#[error("<{subject}> {context}: {source}")]
pub struct ItemError {
    /// Hash or name identifying the item in logs
    pub subject: String,
    pub context: String,
    #[source]
    pub source: DomainError,
}

impl ItemError {
    pub fn new(subject: impl Into<String>, context: impl Into<String>, source: impl Into<DomainError>) -> Self {
        Self {
            subject: subject.into(),
            context: context.into(),
            source: source.into(),
        }
    }
}

/// Attach item context to a fallible step
pub(crate) trait ItemContext<T> {
    fn item(self, subject: &str, context: &str) -> Result<T, ItemError>;
}

impl<T> ItemContext<T> for Result<T, DbError> {
    fn item(self, subject: &str, context: &str) -> Result<T, ItemError> {
        self.map_err(|e| ItemError::new(subject, context, e))
    }
}

impl<T> ItemContext<T> for Result<T, DomainError> {
    fn item(self, subject: &str, context: &str) -> Result<T, ItemError> {
        self.map_err(|e| ItemError::new(subject, context, e))
    }
}

/// Counters for one entity type's pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReport {
    pub kind: EntityKind,
    pub resolved: usize,
    pub written: usize,
    pub failed: usize,
    pub workers: usize,
    pub elapsed: Duration,
}

/// Result of a completed export task
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub task_id: Uuid,
    /// Download handle, set for partial exports only
    pub download_hash: Option<String>,
    /// Directory the documents were written to. For partial exports this
    /// temporary tree no longer exists once the outcome is returned.
    pub output_root: PathBuf,
    pub reports: Vec<PoolReport>,
    pub duration: Duration,
}

impl ExportOutcome {
    pub fn report(&self, kind: EntityKind) -> Option<&PoolReport> {
        self.reports.iter().find(|r| r.kind == kind)
    }

    pub fn written(&self, kind: EntityKind) -> usize {
        self.report(kind).map(|r| r.written).unwrap_or(0)
    }
}
