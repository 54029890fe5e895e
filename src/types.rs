use serde::{Deserialize, Serialize};
use std::fmt;

/// Row ID type used by every library table (SQLite INTEGER primary keys)
pub type EntityId = i64;

/// The seven exportable entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Scene,
    Image,
    Gallery,
    Movie,
    Performer,
    Studio,
    Tag,
}

impl EntityKind {
    /// Pool execution order. Types that only receive dependency ids
    /// (studios, tags) come after every type that appends to them.
    pub const EXPORT_ORDER: [EntityKind; 7] = [
        EntityKind::Scene,
        EntityKind::Image,
        EntityKind::Gallery,
        EntityKind::Movie,
        EntityKind::Performer,
        EntityKind::Studio,
        EntityKind::Tag,
    ];

    /// Plural name, used for log prefixes and output directory names
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Scene => "scenes",
            EntityKind::Image => "images",
            EntityKind::Gallery => "galleries",
            EntityKind::Movie => "movies",
            EntityKind::Performer => "performers",
            EntityKind::Studio => "studios",
            EntityKind::Tag => "tags",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

/// Fingerprint used to name scene documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HashAlgorithm {
    Md5,
    #[default]
    Oshash,
}

impl HashAlgorithm {
    /// Fingerprint type stored alongside files for this algorithm
    pub fn fingerprint_type(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Oshash => "oshash",
        }
    }
}
