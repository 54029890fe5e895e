use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::domains::library::{Entity, RowSource};
use crate::types::{EntityId, EntityKind};

use super::types::{ExportObjectTypeInput, ExportObjectsInput};

/// Which rows of one entity type are in scope.
///
/// The id set is append-only and may be extended by several workers at once.
#[derive(Debug, Default)]
pub struct EntitySelector {
    all: bool,
    ids: Mutex<BTreeSet<EntityId>>,
}

impl EntitySelector {
    pub fn select_all() -> Self {
        Self { all: true, ids: Mutex::new(BTreeSet::new()) }
    }

    pub fn with_ids<I: IntoIterator<Item = EntityId>>(ids: I) -> Self {
        Self { all: false, ids: Mutex::new(ids.into_iter().collect()) }
    }

    /// Build from caller input. Ids that are not numeric are logged and dropped.
    pub fn from_input(kind: EntityKind, input: Option<&ExportObjectTypeInput>) -> Self {
        let Some(input) = input else {
            return Self::default();
        };

        let mut ids = BTreeSet::new();
        for raw in &input.ids {
            match raw.trim().parse::<EntityId>() {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(_) => log::warn!("[{}] ignoring invalid id {:?}", kind, raw),
            }
        }

        Self {
            all: input.all.unwrap_or(false),
            ids: Mutex::new(ids),
        }
    }

    pub fn is_all(&self) -> bool {
        self.all
    }

    /// Sorted snapshot of the accumulated ids
    pub fn ids(&self) -> Vec<EntityId> {
        match self.ids.lock() {
            Ok(ids) => ids.iter().copied().collect(),
            Err(poisoned) => poisoned.into_inner().iter().copied().collect(),
        }
    }

    pub fn insert(&self, id: EntityId) {
        self.extend([id]);
    }

    /// Deduplicating union
    pub fn extend<I: IntoIterator<Item = EntityId>>(&self, ids: I) {
        let mut guard = match self.ids.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.extend(ids);
    }

    /// Rows in scope: everything for a full export or "all", the listed ids
    /// otherwise, nothing when no ids were given. A failed fetch is logged
    /// and treated as zero rows.
    pub async fn resolve<T, R>(&self, full: bool, reader: &R) -> Vec<T>
    where
        T: Entity,
        R: RowSource<T> + ?Sized,
    {
        let result = if full || self.all {
            reader.all().await
        } else {
            let ids = self.ids();
            if ids.is_empty() {
                return Vec::new();
            }
            reader.find_many(&ids).await
        };

        match result {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("[{}] failed to fetch {}: {}", T::KIND, T::KIND, e);
                Vec::new()
            }
        }
    }
}

/// One selector per entity type, owned by a single task run
#[derive(Debug, Default)]
pub struct ExportSelectors {
    pub scenes: EntitySelector,
    pub images: EntitySelector,
    pub galleries: EntitySelector,
    pub movies: EntitySelector,
    pub performers: EntitySelector,
    pub studios: EntitySelector,
    pub tags: EntitySelector,
}

impl ExportSelectors {
    pub fn from_input(input: &ExportObjectsInput) -> Self {
        let pick = |kind| EntitySelector::from_input(kind, input.for_kind(kind));
        Self {
            scenes: pick(EntityKind::Scene),
            images: pick(EntityKind::Image),
            galleries: pick(EntityKind::Gallery),
            movies: pick(EntityKind::Movie),
            performers: pick(EntityKind::Performer),
            studios: pick(EntityKind::Studio),
            tags: pick(EntityKind::Tag),
        }
    }

    pub fn get(&self, kind: EntityKind) -> &EntitySelector {
        match kind {
            EntityKind::Scene => &self.scenes,
            EntityKind::Image => &self.images,
            EntityKind::Gallery => &self.galleries,
            EntityKind::Movie => &self.movies,
            EntityKind::Performer => &self.performers,
            EntityKind::Studio => &self.studios,
            EntityKind::Tag => &self.tags,
        }
    }
}
