use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::{EntityId, EntityKind, HashAlgorithm};

/// Common surface of the seven exportable row types
pub trait Entity: Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> EntityId;

    /// Human-readable identity for log lines
    fn display_name(&self) -> String;
}

#[derive(Debug, Clone, FromRow)]
pub struct Scene {
    pub id: EntityId,
    pub title: Option<String>,
    pub code: Option<String>,
    pub details: Option<String>,
    pub director: Option<String>,
    pub date: Option<String>,
    pub rating: Option<i64>,
    pub organized: bool,
    pub o_counter: i64,
    pub studio_id: Option<EntityId>,
    pub resume_time: f64,
    pub play_count: i64,
    pub play_duration: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Image {
    pub id: EntityId,
    pub title: Option<String>,
    pub code: Option<String>,
    pub details: Option<String>,
    pub photographer: Option<String>,
    pub date: Option<String>,
    pub rating: Option<i64>,
    pub organized: bool,
    pub o_counter: i64,
    pub studio_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Gallery {
    pub id: EntityId,
    pub title: Option<String>,
    pub code: Option<String>,
    pub details: Option<String>,
    pub photographer: Option<String>,
    pub date: Option<String>,
    pub rating: Option<i64>,
    pub organized: bool,
    pub studio_id: Option<EntityId>,
    pub folder_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Performer {
    pub id: EntityId,
    pub name: String,
    pub disambiguation: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub country: Option<String>,
    pub details: Option<String>,
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Studio {
    pub id: EntityId,
    pub name: String,
    pub url: Option<String>,
    pub parent_id: Option<EntityId>,
    pub details: Option<String>,
    pub rating: Option<i64>,
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Tag {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub ignore_auto_tag: bool,
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Movie {
    pub id: EntityId,
    pub name: String,
    pub aliases: Option<String>,
    pub duration: Option<i64>,
    pub date: Option<String>,
    pub rating: Option<i64>,
    pub studio_id: Option<EntityId>,
    pub director: Option<String>,
    pub synopsis: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SceneMarker {
    pub id: EntityId,
    pub scene_id: EntityId,
    pub title: String,
    pub seconds: f64,
    pub primary_tag_id: EntityId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership of a scene in a movie
#[derive(Debug, Clone, FromRow)]
pub struct MovieScene {
    pub movie_id: EntityId,
    pub scene_index: Option<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct GalleryChapter {
    pub id: EntityId,
    pub gallery_id: EntityId,
    pub title: String,
    pub image_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Fingerprint {
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub fingerprint: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Folder {
    pub id: EntityId,
    pub path: String,
    /// Path of the zip archive containing this folder, if any
    pub zip_file_path: Option<String>,
    pub mod_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields shared by every file kind
#[derive(Debug, Clone)]
pub struct BaseFile {
    pub id: EntityId,
    pub path: String,
    pub size: i64,
    pub mod_time: DateTime<Utc>,
    /// Path of the zip archive containing this file, if any
    pub zip_file_path: Option<String>,
    pub fingerprints: Vec<Fingerprint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VideoFile {
    pub base: BaseFile,
    pub format: String,
    pub width: i64,
    pub height: i64,
    pub duration: f64,
    pub video_codec: String,
    pub audio_codec: String,
    pub frame_rate: f64,
    pub bit_rate: i64,
    pub interactive: bool,
    pub interactive_speed: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ImageFile {
    pub base: BaseFile,
    pub format: String,
    pub width: i64,
    pub height: i64,
}

/// A file on disk, one variant per concrete kind
#[derive(Debug, Clone)]
pub enum File {
    Video(VideoFile),
    Image(ImageFile),
    Other(BaseFile),
}

impl File {
    pub fn base(&self) -> &BaseFile {
        match self {
            File::Video(f) => &f.base,
            File::Image(f) => &f.base,
            File::Other(f) => f,
        }
    }

    pub fn path(&self) -> &str {
        &self.base().path
    }

    pub fn fingerprint(&self, kind: &str) -> Option<&str> {
        self.base()
            .fingerprints
            .iter()
            .find(|fp| fp.kind == kind)
            .map(|fp| fp.fingerprint.as_str())
    }
}

/// Hash identifying a scene by its primary file, per naming algorithm
pub fn primary_hash<'a>(files: &'a [File], algorithm: HashAlgorithm) -> Option<&'a str> {
    files.first().and_then(|f| f.fingerprint(algorithm.fingerprint_type()))
}

/// Path of the first (primary) file, if any
pub fn primary_path(files: &[File]) -> Option<&str> {
    files.first().map(|f| f.path())
}

fn titled(kind: &str, id: EntityId, title: &Option<String>) -> String {
    match title.as_deref() {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => format!("{} #{}", kind, id),
    }
}

impl Entity for Scene {
    const KIND: EntityKind = EntityKind::Scene;
    fn id(&self) -> EntityId {
        self.id
    }
    fn display_name(&self) -> String {
        titled("scene", self.id, &self.title)
    }
}

impl Entity for Image {
    const KIND: EntityKind = EntityKind::Image;
    fn id(&self) -> EntityId {
        self.id
    }
    fn display_name(&self) -> String {
        titled("image", self.id, &self.title)
    }
}

impl Entity for Gallery {
    const KIND: EntityKind = EntityKind::Gallery;
    fn id(&self) -> EntityId {
        self.id
    }
    fn display_name(&self) -> String {
        titled("gallery", self.id, &self.title)
    }
}

impl Entity for Performer {
    const KIND: EntityKind = EntityKind::Performer;
    fn id(&self) -> EntityId {
        self.id
    }
    fn display_name(&self) -> String {
        self.name.clone()
    }
}

impl Entity for Studio {
    const KIND: EntityKind = EntityKind::Studio;
    fn id(&self) -> EntityId {
        self.id
    }
    fn display_name(&self) -> String {
        self.name.clone()
    }
}

impl Entity for Tag {
    const KIND: EntityKind = EntityKind::Tag;
    fn id(&self) -> EntityId {
        self.id
    }
    fn display_name(&self) -> String {
        self.name.clone()
    }
}

impl Entity for Movie {
    const KIND: EntityKind = EntityKind::Movie;
    fn id(&self) -> EntityId {
        self.id
    }
    fn display_name(&self) -> String {
        self.name.clone()
    }
}
