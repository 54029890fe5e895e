use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::{DbError, DbResult};
use crate::types::{EntityId, EntityKind};

use super::types::*;

/// Upper bound on bound parameters per `IN (...)` query
const FIND_MANY_CHUNK: usize = 500;

/// Row that owns links to performers, tags or files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Scene(EntityId),
    Image(EntityId),
    Gallery(EntityId),
    Performer(EntityId),
    SceneMarker(EntityId),
}

/// Read access to every row of one entity type
#[async_trait]
pub trait RowSource<T: Entity>: Send + Sync {
    /// Every row of this type visible in the snapshot
    async fn all(&self) -> DbResult<Vec<T>>;

    /// The rows whose ids are listed. Unknown ids are skipped.
    async fn find_many(&self, ids: &[EntityId]) -> DbResult<Vec<T>>;
}

/// Transaction-scoped read access to the library
#[async_trait]
pub trait LibraryReader:
    RowSource<Scene>
    + RowSource<Image>
    + RowSource<Gallery>
    + RowSource<Performer>
    + RowSource<Studio>
    + RowSource<Tag>
    + RowSource<Movie>
{
    async fn find_scenes_by_movie(&self, movie_id: EntityId) -> DbResult<Vec<Scene>>;
    async fn find_images_by_gallery(&self, gallery_id: EntityId) -> DbResult<Vec<Image>>;
    async fn find_galleries_by(&self, owner: Owner) -> DbResult<Vec<Gallery>>;
    async fn find_performers_by(&self, owner: Owner) -> DbResult<Vec<Performer>>;
    async fn find_tags_by(&self, owner: Owner) -> DbResult<Vec<Tag>>;

    async fn find_studio(&self, id: EntityId) -> DbResult<Studio>;
    async fn find_tag(&self, id: EntityId) -> DbResult<Tag>;
    async fn find_movie(&self, id: EntityId) -> DbResult<Movie>;
    async fn find_folder(&self, id: EntityId) -> DbResult<Folder>;

    /// Files linked to the owner, primary file first
    async fn files_of(&self, owner: Owner) -> DbResult<Vec<File>>;
    async fn urls_of(&self, kind: EntityKind, id: EntityId) -> DbResult<Vec<String>>;
    async fn aliases_of(&self, kind: EntityKind, id: EntityId) -> DbResult<Vec<String>>;

    async fn scene_markers(&self, scene_id: EntityId) -> DbResult<Vec<SceneMarker>>;
    async fn scene_movies(&self, scene_id: EntityId) -> DbResult<Vec<MovieScene>>;
    async fn gallery_chapters(&self, gallery_id: EntityId) -> DbResult<Vec<GalleryChapter>>;
    async fn tag_parents(&self, tag_id: EntityId) -> DbResult<Vec<Tag>>;

    /// End the snapshot. Further reads fail.
    async fn release(&self) -> DbResult<()>;
}

/// Source of read snapshots
#[async_trait]
pub trait LibraryStore: Send + Sync {
    async fn begin_read(&self) -> DbResult<Arc<dyn LibraryReader>>;
}

/// Run `f` inside one read transaction and release it afterwards
pub async fn with_read_txn<F, Fut, R>(store: &dyn LibraryStore, f: F) -> DbResult<R>
where
    F: FnOnce(Arc<dyn LibraryReader>) -> Fut,
    Fut: Future<Output = R>,
{
    let reader = store.begin_read().await?;
    let result = f(reader.clone()).await;
    reader.release().await?;
    Ok(result)
}

// --- SQLite implementation ---

/// Table backing each entity type
pub trait SqlTable {
    const TABLE: &'static str;
}

impl SqlTable for Scene {
    const TABLE: &'static str = "scenes";
}
impl SqlTable for Image {
    const TABLE: &'static str = "images";
}
impl SqlTable for Gallery {
    const TABLE: &'static str = "galleries";
}
impl SqlTable for Performer {
    const TABLE: &'static str = "performers";
}
impl SqlTable for Studio {
    const TABLE: &'static str = "studios";
}
impl SqlTable for Tag {
    const TABLE: &'static str = "tags";
}
impl SqlTable for Movie {
    const TABLE: &'static str = "movies";
}

pub struct SqliteLibrary {
    pool: SqlitePool,
}

impl SqliteLibrary {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LibraryStore for SqliteLibrary {
    async fn begin_read(&self) -> DbResult<Arc<dyn LibraryReader>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::Transaction(format!("failed to begin read transaction: {}", e)))?;
        Ok(Arc::new(SqliteReadTxn { tx: Mutex::new(Some(tx)) }))
    }
}

/// One read transaction shared by every worker of an export.
/// Statements are serialized on the single underlying connection.
pub struct SqliteReadTxn {
    tx: Mutex<Option<Transaction<'static, Sqlite>>>,
}

#[derive(Debug, FromRow)]
struct FileRow {
    id: EntityId,
    basename: String,
    folder_path: String,
    size: i64,
    mod_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    zip_folder_path: Option<String>,
    zip_basename: Option<String>,
    video_file_id: Option<EntityId>,
    video_format: Option<String>,
    video_width: Option<i64>,
    video_height: Option<i64>,
    duration: Option<f64>,
    video_codec: Option<String>,
    audio_codec: Option<String>,
    frame_rate: Option<f64>,
    bit_rate: Option<i64>,
    interactive: Option<bool>,
    interactive_speed: Option<i64>,
    image_file_id: Option<EntityId>,
    image_format: Option<String>,
    image_width: Option<i64>,
    image_height: Option<i64>,
}

#[derive(Debug, FromRow)]
struct FingerprintRow {
    file_id: EntityId,
    #[sqlx(rename = "type")]
    kind: String,
    fingerprint: String,
}

#[derive(Debug, FromRow)]
struct TextRow {
    value: String,
}

fn join_path(folder: &str, basename: &str) -> String {
    Path::new(folder).join(basename).to_string_lossy().into_owned()
}

impl FileRow {
    fn into_file(self, fingerprints: Vec<Fingerprint>) -> File {
        let zip_file_path = match (self.zip_folder_path, self.zip_basename) {
            (Some(folder), Some(name)) => Some(join_path(&folder, &name)),
            _ => None,
        };
        let base = BaseFile {
            id: self.id,
            path: join_path(&self.folder_path, &self.basename),
            size: self.size,
            mod_time: self.mod_time,
            zip_file_path,
            fingerprints,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };

        if self.video_file_id.is_some() {
            File::Video(VideoFile {
                base,
                format: self.video_format.unwrap_or_default(),
                width: self.video_width.unwrap_or_default(),
                height: self.video_height.unwrap_or_default(),
                duration: self.duration.unwrap_or_default(),
                video_codec: self.video_codec.unwrap_or_default(),
                audio_codec: self.audio_codec.unwrap_or_default(),
                frame_rate: self.frame_rate.unwrap_or_default(),
                bit_rate: self.bit_rate.unwrap_or_default(),
                interactive: self.interactive.unwrap_or_default(),
                interactive_speed: self.interactive_speed,
            })
        } else if self.image_file_id.is_some() {
            File::Image(ImageFile {
                base,
                format: self.image_format.unwrap_or_default(),
                width: self.image_width.unwrap_or_default(),
                height: self.image_height.unwrap_or_default(),
            })
        } else {
            File::Other(base)
        }
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn performer_link(owner: Owner) -> DbResult<(&'static str, &'static str, EntityId)> {
    match owner {
        Owner::Scene(id) => Ok(("performers_scenes", "scene_id", id)),
        Owner::Image(id) => Ok(("performers_images", "image_id", id)),
        Owner::Gallery(id) => Ok(("performers_galleries", "gallery_id", id)),
        other => Err(DbError::Query(format!("performers are not linked to {:?}", other))),
    }
}

fn tag_link(owner: Owner) -> (&'static str, &'static str, EntityId) {
    match owner {
        Owner::Scene(id) => ("scenes_tags", "scene_id", id),
        Owner::Image(id) => ("images_tags", "image_id", id),
        Owner::Gallery(id) => ("galleries_tags", "gallery_id", id),
        Owner::Performer(id) => ("performers_tags", "performer_id", id),
        Owner::SceneMarker(id) => ("scene_markers_tags", "scene_marker_id", id),
    }
}

fn file_link(owner: Owner) -> DbResult<(&'static str, &'static str, EntityId)> {
    match owner {
        Owner::Scene(id) => Ok(("scenes_files", "scene_id", id)),
        Owner::Image(id) => Ok(("images_files", "image_id", id)),
        Owner::Gallery(id) => Ok(("galleries_files", "gallery_id", id)),
        other => Err(DbError::Query(format!("files are not linked to {:?}", other))),
    }
}

fn url_table(kind: EntityKind) -> DbResult<(&'static str, &'static str)> {
    match kind {
        EntityKind::Scene => Ok(("scene_urls", "scene_id")),
        EntityKind::Image => Ok(("image_urls", "image_id")),
        EntityKind::Gallery => Ok(("gallery_urls", "gallery_id")),
        EntityKind::Performer => Ok(("performer_urls", "performer_id")),
        other => Err(DbError::Query(format!("{} have no url list", other))),
    }
}

fn alias_table(kind: EntityKind) -> DbResult<(&'static str, &'static str)> {
    match kind {
        EntityKind::Performer => Ok(("performer_aliases", "performer_id")),
        EntityKind::Studio => Ok(("studio_aliases", "studio_id")),
        EntityKind::Tag => Ok(("tag_aliases", "tag_id")),
        other => Err(DbError::Query(format!("{} have no alias list", other))),
    }
}

impl SqliteReadTxn {
    async fn fetch_rows<T>(&self, sql: &str, binds: &[EntityId]) -> DbResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| DbError::Transaction("read transaction already released".to_string()))?;

        let mut query = sqlx::query_as::<_, T>(sql);
        for id in binds {
            query = query.bind(*id);
        }
        Ok(query.fetch_all(&mut **tx).await?)
    }

    async fn fetch_one<T>(&self, sql: &str, id: EntityId, what: &str) -> DbResult<T>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        self.fetch_rows::<T>(sql, &[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound(what.to_string(), id.to_string()))
    }

    async fn fingerprints(&self, file_ids: &[EntityId]) -> DbResult<HashMap<EntityId, Vec<Fingerprint>>> {
        let mut by_file: HashMap<EntityId, Vec<Fingerprint>> = HashMap::new();
        for chunk in file_ids.chunks(FIND_MANY_CHUNK) {
            let sql = format!(
                "SELECT file_id, type, fingerprint FROM files_fingerprints WHERE file_id IN ({}) ORDER BY file_id, type",
                placeholders(chunk.len())
            );
            for row in self.fetch_rows::<FingerprintRow>(&sql, chunk).await? {
                by_file.entry(row.file_id).or_default().push(Fingerprint {
                    kind: row.kind,
                    fingerprint: row.fingerprint,
                });
            }
        }
        Ok(by_file)
    }
}

#[async_trait]
impl<T> RowSource<T> for SqliteReadTxn
where
    T: Entity + SqlTable + for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    async fn all(&self) -> DbResult<Vec<T>> {
        let sql = format!("SELECT * FROM {} ORDER BY id", T::TABLE);
        self.fetch_rows::<T>(&sql, &[]).await
    }

    async fn find_many(&self, ids: &[EntityId]) -> DbResult<Vec<T>> {
        let mut rows = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(FIND_MANY_CHUNK) {
            let sql = format!(
                "SELECT * FROM {} WHERE id IN ({}) ORDER BY id",
                T::TABLE,
                placeholders(chunk.len())
            );
            rows.extend(self.fetch_rows::<T>(&sql, chunk).await?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl LibraryReader for SqliteReadTxn {
    async fn find_scenes_by_movie(&self, movie_id: EntityId) -> DbResult<Vec<Scene>> {
        self.fetch_rows(
            "SELECT s.* FROM scenes s JOIN movies_scenes ms ON ms.scene_id = s.id \
             WHERE ms.movie_id = ? ORDER BY s.id",
            &[movie_id],
        )
        .await
    }

    async fn find_images_by_gallery(&self, gallery_id: EntityId) -> DbResult<Vec<Image>> {
        self.fetch_rows(
            "SELECT i.* FROM images i JOIN galleries_images gi ON gi.image_id = i.id \
             WHERE gi.gallery_id = ? ORDER BY i.id",
            &[gallery_id],
        )
        .await
    }

    async fn find_galleries_by(&self, owner: Owner) -> DbResult<Vec<Gallery>> {
        let (table, column, id) = match owner {
            Owner::Scene(id) => ("scenes_galleries", "scene_id", id),
            Owner::Image(id) => ("galleries_images", "image_id", id),
            other => return Err(DbError::Query(format!("galleries are not linked to {:?}", other))),
        };
        let sql = format!(
            "SELECT g.* FROM galleries g JOIN {table} l ON l.gallery_id = g.id WHERE l.{column} = ? ORDER BY g.id"
        );
        self.fetch_rows(&sql, &[id]).await
    }

    async fn find_performers_by(&self, owner: Owner) -> DbResult<Vec<Performer>> {
        let (table, column, id) = performer_link(owner)?;
        let sql = format!(
            "SELECT p.* FROM performers p JOIN {table} l ON l.performer_id = p.id WHERE l.{column} = ? ORDER BY p.name, p.id"
        );
        self.fetch_rows(&sql, &[id]).await
    }

    async fn find_tags_by(&self, owner: Owner) -> DbResult<Vec<Tag>> {
        let (table, column, id) = tag_link(owner);
        let sql = format!(
            "SELECT t.* FROM tags t JOIN {table} l ON l.tag_id = t.id WHERE l.{column} = ? ORDER BY t.name, t.id"
        );
        self.fetch_rows(&sql, &[id]).await
    }

    async fn find_studio(&self, id: EntityId) -> DbResult<Studio> {
        self.fetch_one("SELECT * FROM studios WHERE id = ?", id, "studio").await
    }

    async fn find_tag(&self, id: EntityId) -> DbResult<Tag> {
        self.fetch_one("SELECT * FROM tags WHERE id = ?", id, "tag").await
    }

    async fn find_movie(&self, id: EntityId) -> DbResult<Movie> {
        self.fetch_one("SELECT * FROM movies WHERE id = ?", id, "movie").await
    }

    async fn find_folder(&self, id: EntityId) -> DbResult<Folder> {
        self.fetch_one(
            "SELECT fo.id, fo.path, fo.mod_time, fo.created_at, fo.updated_at, \
                    CASE WHEN zf.id IS NULL THEN NULL ELSE zfo.path || '/' || zf.basename END AS zip_file_path \
             FROM folders fo \
             LEFT JOIN files zf ON zf.id = fo.zip_file_id \
             LEFT JOIN folders zfo ON zfo.id = zf.parent_folder_id \
             WHERE fo.id = ?",
            id,
            "folder",
        )
        .await
    }

    async fn files_of(&self, owner: Owner) -> DbResult<Vec<File>> {
        let (table, column, id) = file_link(owner)?;
        let sql = format!(
            "SELECT f.id, f.basename, fo.path AS folder_path, f.size, f.mod_time, f.created_at, f.updated_at, \
                    zfo.path AS zip_folder_path, zf.basename AS zip_basename, \
                    v.file_id AS video_file_id, v.format AS video_format, v.width AS video_width, \
                    v.height AS video_height, v.duration, v.video_codec, v.audio_codec, v.frame_rate, \
                    v.bit_rate, v.interactive, v.interactive_speed, \
                    i.file_id AS image_file_id, i.format AS image_format, i.width AS image_width, \
                    i.height AS image_height \
             FROM {table} l \
             JOIN files f ON f.id = l.file_id \
             JOIN folders fo ON fo.id = f.parent_folder_id \
             LEFT JOIN files zf ON zf.id = f.zip_file_id \
             LEFT JOIN folders zfo ON zfo.id = zf.parent_folder_id \
             LEFT JOIN video_files v ON v.file_id = f.id \
             LEFT JOIN image_files i ON i.file_id = f.id \
             WHERE l.{column} = ? \
             ORDER BY l.is_primary DESC, f.id"
        );
        let rows: Vec<FileRow> = self.fetch_rows(&sql, &[id]).await?;
        let ids: Vec<EntityId> = rows.iter().map(|r| r.id).collect();
        let mut fingerprints = self.fingerprints(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let fps = fingerprints.remove(&row.id).unwrap_or_default();
                row.into_file(fps)
            })
            .collect())
    }

    async fn urls_of(&self, kind: EntityKind, id: EntityId) -> DbResult<Vec<String>> {
        let (table, column) = url_table(kind)?;
        let sql = format!("SELECT url AS value FROM {table} WHERE {column} = ? ORDER BY position");
        let rows: Vec<TextRow> = self.fetch_rows(&sql, &[id]).await?;
        Ok(rows.into_iter().map(|r| r.value).collect())
    }

    async fn aliases_of(&self, kind: EntityKind, id: EntityId) -> DbResult<Vec<String>> {
        let (table, column) = alias_table(kind)?;
        let sql = format!("SELECT alias AS value FROM {table} WHERE {column} = ? ORDER BY alias");
        let rows: Vec<TextRow> = self.fetch_rows(&sql, &[id]).await?;
        Ok(rows.into_iter().map(|r| r.value).collect())
    }

    async fn scene_markers(&self, scene_id: EntityId) -> DbResult<Vec<SceneMarker>> {
        self.fetch_rows(
            "SELECT * FROM scene_markers WHERE scene_id = ? ORDER BY seconds, id",
            &[scene_id],
        )
        .await
    }

    async fn scene_movies(&self, scene_id: EntityId) -> DbResult<Vec<MovieScene>> {
        self.fetch_rows(
            "SELECT movie_id, scene_index FROM movies_scenes WHERE scene_id = ? ORDER BY movie_id",
            &[scene_id],
        )
        .await
    }

    async fn gallery_chapters(&self, gallery_id: EntityId) -> DbResult<Vec<GalleryChapter>> {
        self.fetch_rows(
            "SELECT * FROM galleries_chapters WHERE gallery_id = ? ORDER BY image_index, id",
            &[gallery_id],
        )
        .await
    }

    async fn tag_parents(&self, tag_id: EntityId) -> DbResult<Vec<Tag>> {
        self.fetch_rows(
            "SELECT t.* FROM tags t JOIN tags_relations r ON r.parent_id = t.id \
             WHERE r.child_id = ? ORDER BY t.name, t.id",
            &[tag_id],
        )
        .await
    }

    async fn release(&self) -> DbResult<()> {
        let tx = self.tx.lock().await.take();
        match tx {
            // nothing was written, rolling back just ends the snapshot
            Some(tx) => tx
                .rollback()
                .await
                .map_err(|e| DbError::Transaction(format!("failed to end read transaction: {}", e))),
            None => Ok(()),
        }
    }
}
