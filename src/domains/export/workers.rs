use std::future::Future;
use std::sync::Arc;

use crate::domains::library::{
    primary_hash, primary_path, Entity, File, Gallery, Image, LibraryReader, Movie, Owner, Performer, RowSource,
    Scene, SceneMarker, Studio, Tag,
};
use crate::errors::DbResult;
use crate::types::{EntityId, EntityKind, HashAlgorithm};

use super::jsonschema::*;
use super::paths::JsonPaths;
use super::pool::WorkerPool;
use super::selector::ExportSelectors;
use super::types::{ItemContext, ItemError, PoolReport};
use super::writer::DocumentWriter;

/// Everything a worker needs, shared by all pools of one task run
pub struct ExportContext {
    pub reader: Arc<dyn LibraryReader>,
    pub selectors: Arc<ExportSelectors>,
    pub paths: JsonPaths,
    pub writer: DocumentWriter,
    pub include_dependencies: bool,
    pub hash_algorithm: HashAlgorithm,
}

fn names<T: Entity>(rows: &[T]) -> Vec<String> {
    rows.iter().map(|r| r.display_name()).collect()
}

fn ids<T: Entity>(rows: &[T]) -> impl Iterator<Item = EntityId> + '_ {
    rows.iter().map(|r| r.id())
}

fn file_paths(files: &[File]) -> Vec<String> {
    files.iter().map(|f| f.path().to_string()).collect()
}

/// Resolve one type's rows and drain them through the pool
pub async fn export_kind(ctx: &Arc<ExportContext>, pool: WorkerPool, kind: EntityKind, full: bool) -> PoolReport {
    match kind {
        EntityKind::Scene => run_pool(ctx, pool, full, |ctx, s: Scene| async move { ctx.export_scene(s).await }).await,
        EntityKind::Image => run_pool(ctx, pool, full, |ctx, i: Image| async move { ctx.export_image(i).await }).await,
        EntityKind::Gallery => {
            run_pool(ctx, pool, full, |ctx, g: Gallery| async move { ctx.export_gallery(g).await }).await
        }
        EntityKind::Movie => run_pool(ctx, pool, full, |ctx, m: Movie| async move { ctx.export_movie(m).await }).await,
        EntityKind::Performer => {
            run_pool(ctx, pool, full, |ctx, p: Performer| async move { ctx.export_performer(p).await }).await
        }
        EntityKind::Studio => {
            run_pool(ctx, pool, full, |ctx, s: Studio| async move { ctx.export_studio(s).await }).await
        }
        EntityKind::Tag => run_pool(ctx, pool, full, |ctx, t: Tag| async move { ctx.export_tag(t).await }).await,
    }
}

async fn run_pool<T, F, Fut>(ctx: &Arc<ExportContext>, pool: WorkerPool, full: bool, export: F) -> PoolReport
where
    T: Entity,
    dyn LibraryReader: RowSource<T>,
    F: Fn(Arc<ExportContext>, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ItemError>> + Send + 'static,
{
    let items: Vec<T> = ctx.selectors.get(T::KIND).resolve(full, &*ctx.reader).await;
    let shared = ctx.clone();
    pool.run(T::KIND, items, move |item| export(shared.clone(), item)).await
}

impl ExportContext {
    // --- shared lookups ---

    async fn studio_name(&self, studio_id: Option<EntityId>) -> DbResult<Option<String>> {
        match studio_id {
            Some(id) => Ok(Some(self.reader.find_studio(id).await?.name)),
            None => Ok(None),
        }
    }

    async fn gallery_refs(&self, galleries: &[Gallery]) -> DbResult<Vec<GalleryRef>> {
        let mut refs = Vec::with_capacity(galleries.len());
        for gallery in galleries {
            let files = self.reader.files_of(Owner::Gallery(gallery.id)).await?;
            let gallery_ref = if !files.is_empty() {
                GalleryRef { zip_files: file_paths(&files), folder_path: None, title: None }
            } else if let Some(folder_id) = gallery.folder_id {
                let folder = self.reader.find_folder(folder_id).await?;
                GalleryRef { zip_files: Vec::new(), folder_path: Some(folder.path), title: None }
            } else {
                GalleryRef { zip_files: Vec::new(), folder_path: None, title: gallery.title.clone() }
            };
            refs.push(gallery_ref);
        }
        Ok(refs)
    }

    /// Marker documents plus every tag id they reference
    async fn markers_json(&self, markers: &[SceneMarker]) -> DbResult<(Vec<SceneMarkerJson>, Vec<EntityId>)> {
        let mut docs = Vec::with_capacity(markers.len());
        let mut tag_ids = Vec::new();
        for marker in markers {
            let primary = self.reader.find_tag(marker.primary_tag_id).await?;
            let tags = self.reader.find_tags_by(Owner::SceneMarker(marker.id)).await?;
            tag_ids.push(primary.id);
            tag_ids.extend(ids(&tags));
            docs.push(SceneMarkerJson {
                title: marker.title.clone(),
                seconds: marker.seconds.to_string(),
                primary_tag: primary.name,
                tags: names(&tags),
                created_at: marker.created_at,
                updated_at: marker.updated_at,
            });
        }
        Ok((docs, tag_ids))
    }

    /// Write a side-document per file. Failures are logged only.
    fn export_files(&self, files: &[File]) {
        for file in files {
            self.export_dir_entry(DirEntryJson::from(file));
        }
    }

    fn export_dir_entry(&self, entry: DirEntryJson) {
        let dir = if entry.is_folder() { self.paths.folders_dir() } else { self.paths.files_dir() };
        let name = entry.filename();
        if let Err(e) = self.writer.save(&dir, &name, &entry) {
            log::error!("[files] <{}> failed to save json: {}", name, e);
        }
    }

    fn save<T: serde::Serialize>(&self, kind: EntityKind, subject: &str, name: &str, doc: &T) -> Result<(), ItemError> {
        self.writer
            .save(&self.paths.kind_dir(kind), name, doc)
            .item(subject, "failed to save json")
    }

    // --- per-type bodies ---

    pub async fn export_scene(&self, scene: Scene) -> Result<(), ItemError> {
        let reader = &self.reader;
        let id = scene.id;

        let files = reader
            .files_of(Owner::Scene(id))
            .await
            .item(&scene.display_name(), "error loading scene files")?;
        let hash = primary_hash(&files, self.hash_algorithm).map(str::to_string);
        let subject = hash.clone().unwrap_or_else(|| scene.display_name());
        let subject = subject.as_str();

        let urls = reader
            .urls_of(EntityKind::Scene, id)
            .await
            .item(subject, "error loading scene urls")?;

        let mut doc = SceneJson {
            title: scene.title.clone(),
            code: scene.code.clone(),
            urls,
            date: scene.date.clone(),
            rating: scene.rating,
            organized: scene.organized,
            o_counter: scene.o_counter,
            details: scene.details.clone(),
            director: scene.director.clone(),
            files: file_paths(&files),
            resume_time: scene.resume_time,
            play_count: scene.play_count,
            play_duration: scene.play_duration,
            created_at: Some(scene.created_at),
            updated_at: Some(scene.updated_at),
            ..Default::default()
        };

        self.export_files(&files);

        doc.studio = self
            .studio_name(scene.studio_id)
            .await
            .item(subject, "error getting scene studio name")?;

        let galleries = reader
            .find_galleries_by(Owner::Scene(id))
            .await
            .item(subject, "error getting scene gallery checksums")?;
        doc.galleries = self
            .gallery_refs(&galleries)
            .await
            .item(subject, "error getting scene gallery files")?;

        let performers = reader
            .find_performers_by(Owner::Scene(id))
            .await
            .item(subject, "error getting scene performer names")?;
        doc.performers = names(&performers);

        let tags = reader
            .find_tags_by(Owner::Scene(id))
            .await
            .item(subject, "error getting scene tag names")?;
        doc.tags = names(&tags);

        let markers = reader
            .scene_markers(id)
            .await
            .item(subject, "error getting scene markers JSON")?;
        let (markers, marker_tag_ids) = self
            .markers_json(&markers)
            .await
            .item(subject, "error getting scene markers JSON")?;
        doc.markers = markers;

        let memberships = reader
            .scene_movies(id)
            .await
            .item(subject, "error getting scene movies JSON")?;
        for membership in &memberships {
            let movie = reader
                .find_movie(membership.movie_id)
                .await
                .item(subject, "error getting scene movies JSON")?;
            doc.movies.push(SceneMovieJson {
                movie_name: movie.name,
                scene_index: membership.scene_index,
            });
        }

        let basename = primary_path(&files).map(base_name).unwrap_or_default();
        let name = doc.filename(id, &basename, hash.as_deref());
        self.save(EntityKind::Scene, subject, &name, &doc)?;

        if self.include_dependencies {
            let deps = &self.selectors;
            deps.studios.extend(scene.studio_id);
            deps.galleries.extend(ids(&galleries));
            deps.tags.extend(ids(&tags).chain(marker_tag_ids));
            deps.movies.extend(memberships.iter().map(|m| m.movie_id));
            deps.performers.extend(ids(&performers));
        }
        Ok(())
    }

    pub async fn export_image(&self, image: Image) -> Result<(), ItemError> {
        let reader = &self.reader;
        let id = image.id;

        let files = reader
            .files_of(Owner::Image(id))
            .await
            .item(&image.display_name(), "error getting image files")?;
        let checksum = files.first().and_then(|f| f.fingerprint("md5")).map(str::to_string);
        let subject = checksum.clone().unwrap_or_else(|| image.display_name());
        let subject = subject.as_str();

        let urls = reader
            .urls_of(EntityKind::Image, id)
            .await
            .item(subject, "error getting image urls")?;

        let mut doc = ImageJson {
            title: image.title.clone(),
            code: image.code.clone(),
            rating: image.rating,
            urls,
            date: image.date.clone(),
            details: image.details.clone(),
            photographer: image.photographer.clone(),
            organized: image.organized,
            o_counter: image.o_counter,
            files: file_paths(&files),
            created_at: Some(image.created_at),
            updated_at: Some(image.updated_at),
            ..Default::default()
        };

        self.export_files(&files);

        doc.studio = self
            .studio_name(image.studio_id)
            .await
            .item(subject, "error getting image studio name")?;

        let galleries = reader
            .find_galleries_by(Owner::Image(id))
            .await
            .item(subject, "error getting image galleries")?;
        doc.galleries = self
            .gallery_refs(&galleries)
            .await
            .item(subject, "error getting image gallery files")?;

        let performers = reader
            .find_performers_by(Owner::Image(id))
            .await
            .item(subject, "error getting image performer names")?;
        doc.performers = names(&performers);

        let tags = reader
            .find_tags_by(Owner::Image(id))
            .await
            .item(subject, "error getting image tag names")?;
        doc.tags = names(&tags);

        let basename = primary_path(&files).map(base_name).unwrap_or_default();
        let name = doc.filename(id, &basename, checksum.as_deref());
        self.save(EntityKind::Image, subject, &name, &doc)?;

        if self.include_dependencies {
            let deps = &self.selectors;
            deps.studios.extend(image.studio_id);
            deps.galleries.extend(ids(&galleries));
            deps.tags.extend(ids(&tags));
            deps.performers.extend(ids(&performers));
        }
        Ok(())
    }

    pub async fn export_gallery(&self, gallery: Gallery) -> Result<(), ItemError> {
        let reader = &self.reader;
        let id = gallery.id;

        let files = reader
            .files_of(Owner::Gallery(id))
            .await
            .item(&gallery.display_name(), "failed to fetch files for gallery")?;
        let subject = files
            .first()
            .and_then(|f| f.fingerprint("md5"))
            .map(str::to_string)
            .unwrap_or_else(|| gallery.display_name());
        let subject = subject.as_str();

        let urls = reader
            .urls_of(EntityKind::Gallery, id)
            .await
            .item(subject, "error getting gallery urls")?;

        let mut doc = GalleryJson {
            zip_files: file_paths(&files),
            title: gallery.title.clone(),
            code: gallery.code.clone(),
            urls,
            date: gallery.date.clone(),
            details: gallery.details.clone(),
            photographer: gallery.photographer.clone(),
            rating: gallery.rating,
            organized: gallery.organized,
            created_at: Some(gallery.created_at),
            updated_at: Some(gallery.updated_at),
            ..Default::default()
        };

        self.export_files(&files);

        if let Some(folder_id) = gallery.folder_id {
            let folder = reader
                .find_folder(folder_id)
                .await
                .item(subject, "error getting gallery folder")?;
            doc.folder_path = Some(folder.path.clone());
            self.export_dir_entry(DirEntryJson::from(&folder));
        }

        doc.studio = self
            .studio_name(gallery.studio_id)
            .await
            .item(subject, "error getting gallery studio name")?;

        let performers = reader
            .find_performers_by(Owner::Gallery(id))
            .await
            .item(subject, "error getting gallery performer names")?;
        doc.performers = names(&performers);

        let tags = reader
            .find_tags_by(Owner::Gallery(id))
            .await
            .item(subject, "error getting gallery tag names")?;
        doc.tags = names(&tags);

        let chapters = reader
            .gallery_chapters(id)
            .await
            .item(subject, "error getting gallery chapters JSON")?;
        doc.chapters = chapters
            .into_iter()
            .map(|c| GalleryChapterJson {
                title: c.title,
                image_index: c.image_index,
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
            .collect();

        // zip file or folder name, falling back to the title
        let basename = doc
            .zip_files
            .first()
            .or(doc.folder_path.as_ref())
            .map(|p| base_name(p))
            .unwrap_or_default();
        let name = doc.filename(id, &basename);
        self.save(EntityKind::Gallery, subject, &name, &doc)?;

        if self.include_dependencies {
            let deps = &self.selectors;
            deps.studios.extend(gallery.studio_id);
            deps.tags.extend(ids(&tags));
            deps.performers.extend(ids(&performers));
        }
        Ok(())
    }

    pub async fn export_performer(&self, performer: Performer) -> Result<(), ItemError> {
        let reader = &self.reader;
        let subject = performer.name.as_str();

        let urls = reader
            .urls_of(EntityKind::Performer, performer.id)
            .await
            .item(subject, "error getting performer JSON")?;
        let aliases = reader
            .aliases_of(EntityKind::Performer, performer.id)
            .await
            .item(subject, "error getting performer JSON")?;
        let tags = reader
            .find_tags_by(Owner::Performer(performer.id))
            .await
            .item(subject, "error getting performer tags")?;

        let doc = PerformerJson {
            name: performer.name.clone(),
            disambiguation: performer.disambiguation.clone(),
            gender: performer.gender.clone(),
            urls,
            birthdate: performer.birthdate.clone(),
            country: performer.country.clone(),
            aliases,
            details: performer.details.clone(),
            favorite: performer.favorite,
            tags: names(&tags),
            created_at: Some(performer.created_at),
            updated_at: Some(performer.updated_at),
        };

        let name = doc.filename(performer.id);
        self.save(EntityKind::Performer, subject, &name, &doc)?;

        if self.include_dependencies {
            self.selectors.tags.extend(ids(&tags));
        }
        Ok(())
    }

    pub async fn export_studio(&self, studio: Studio) -> Result<(), ItemError> {
        let subject = studio.name.as_str();

        let parent_studio = self
            .studio_name(studio.parent_id)
            .await
            .item(subject, "error getting studio JSON")?;
        let aliases = self
            .reader
            .aliases_of(EntityKind::Studio, studio.id)
            .await
            .item(subject, "error getting studio JSON")?;

        let doc = StudioJson {
            name: studio.name.clone(),
            url: studio.url.clone(),
            parent_studio,
            rating: studio.rating,
            details: studio.details.clone(),
            aliases,
            favorite: studio.favorite,
            created_at: Some(studio.created_at),
            updated_at: Some(studio.updated_at),
        };

        let name = doc.filename(studio.id);
        self.save(EntityKind::Studio, subject, &name, &doc)
    }

    pub async fn export_tag(&self, tag: Tag) -> Result<(), ItemError> {
        let subject = tag.name.as_str();

        let aliases = self
            .reader
            .aliases_of(EntityKind::Tag, tag.id)
            .await
            .item(subject, "error getting tag JSON")?;
        let parents = self
            .reader
            .tag_parents(tag.id)
            .await
            .item(subject, "error getting tag JSON")?;

        let doc = TagJson {
            name: tag.name.clone(),
            description: tag.description.clone(),
            aliases,
            parents: names(&parents),
            ignore_auto_tag: tag.ignore_auto_tag,
            favorite: tag.favorite,
            created_at: Some(tag.created_at),
            updated_at: Some(tag.updated_at),
        };

        let name = doc.filename(tag.id);
        self.save(EntityKind::Tag, subject, &name, &doc)
    }

    pub async fn export_movie(&self, movie: Movie) -> Result<(), ItemError> {
        let subject = movie.name.as_str();

        let studio = self
            .studio_name(movie.studio_id)
            .await
            .item(subject, "error getting movie JSON")?;

        let doc = MovieJson {
            name: movie.name.clone(),
            aliases: movie.aliases.clone(),
            duration: movie.duration,
            date: movie.date.clone(),
            rating: movie.rating,
            director: movie.director.clone(),
            synopsis: movie.synopsis.clone(),
            url: movie.url.clone(),
            studio,
            created_at: Some(movie.created_at),
            updated_at: Some(movie.updated_at),
        };

        let name = doc.filename(movie.id);
        self.save(EntityKind::Movie, subject, &name, &doc)?;

        if self.include_dependencies {
            self.selectors.studios.extend(movie.studio_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::library::testing as seed;
    use crate::domains::library::{LibraryStore, SqliteLibrary};
    use sqlx::SqlitePool;
    use std::path::Path;

    struct Fixture {
        _root: tempfile::TempDir,
        ctx: Arc<ExportContext>,
    }

    async fn fixture(pool: SqlitePool, include_dependencies: bool) -> Fixture {
        let library = SqliteLibrary::new(pool);
        let root = tempfile::tempdir().unwrap();
        let paths = JsonPaths::new(root.path());
        paths.ensure_dirs().unwrap();

        let ctx = Arc::new(ExportContext {
            reader: library.begin_read().await.unwrap(),
            selectors: Arc::new(ExportSelectors::default()),
            paths,
            writer: DocumentWriter,
            include_dependencies,
            hash_algorithm: HashAlgorithm::Oshash,
        });
        Fixture { _root: root, ctx }
    }

    fn read_dir(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    async fn scene_library() -> SqlitePool {
        let pool = seed::memory_pool().await;
        seed::studio(&pool, 1, "Acme").await;
        seed::tag(&pool, 1, "outdoor").await;
        seed::tag(&pool, 2, "chapter").await;
        seed::tag(&pool, 3, "closeup").await;
        seed::performer(&pool, 1, "Jane", None).await;
        seed::movie(&pool, 1, "Feature", Some(1)).await;
        seed::gallery(&pool, 1, Some("Album"), None, None).await;

        seed::scene(&pool, 1, Some("Beach Day"), Some(1)).await;
        seed::folder(&pool, 1, "/media").await;
        seed::video_file(&pool, 10, 1, "beach.mp4").await;
        seed::fingerprint(&pool, 10, "oshash", "abc123").await;
        seed::link(&pool, "scenes_files", "scene_id", 1, "file_id", 10).await;
        seed::link(&pool, "scenes_tags", "scene_id", 1, "tag_id", 1).await;
        seed::link(&pool, "performers_scenes", "performer_id", 1, "scene_id", 1).await;
        seed::link(&pool, "scenes_galleries", "scene_id", 1, "gallery_id", 1).await;
        seed::exec(
            &pool,
            "INSERT INTO movies_scenes (movie_id, scene_id, scene_index) VALUES (1, 1, 2)",
        )
        .await;
        seed::exec(
            &pool,
            "INSERT INTO scene_markers (id, scene_id, title, seconds, primary_tag_id, created_at, updated_at) \
             VALUES (1, 1, 'intro', 12.5, 2, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .await;
        seed::link(&pool, "scene_markers_tags", "scene_marker_id", 1, "tag_id", 3).await;
        pool
    }

    #[tokio::test]
    async fn test_scene_document() {
        let pool = scene_library().await;
        let fx = fixture(pool, true).await;
        let scene: Vec<Scene> = RowSource::<Scene>::all(&*fx.ctx.reader).await.unwrap();

        fx.ctx.export_scene(scene[0].clone()).await.unwrap();

        let dir = fx.ctx.paths.kind_dir(EntityKind::Scene);
        assert_eq!(read_dir(&dir), vec!["Beach Day.abc123.1.json"]);

        let text = std::fs::read_to_string(dir.join("Beach Day.abc123.1.json")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["studio"], "Acme");
        assert_eq!(doc["performers"][0], "Jane");
        assert_eq!(doc["tags"][0], "outdoor");
        assert_eq!(doc["galleries"][0]["title"], "Album");
        assert_eq!(doc["movies"][0]["movie_name"], "Feature");
        assert_eq!(doc["movies"][0]["scene_index"], 2);
        assert_eq!(doc["markers"][0]["seconds"], "12.5");
        assert_eq!(doc["markers"][0]["primary_tag"], "chapter");
        assert_eq!(doc["files"][0], "/media/beach.mp4");

        assert_eq!(read_dir(&fx.ctx.paths.files_dir()).len(), 1);

        let deps = &fx.ctx.selectors;
        assert_eq!(deps.studios.ids(), vec![1]);
        assert_eq!(deps.tags.ids(), vec![1, 2, 3]);
        assert_eq!(deps.performers.ids(), vec![1]);
        assert_eq!(deps.movies.ids(), vec![1]);
        assert_eq!(deps.galleries.ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_dependencies_not_accumulated_when_disabled() {
        let pool = scene_library().await;
        let fx = fixture(pool, false).await;
        let scene: Vec<Scene> = RowSource::<Scene>::all(&*fx.ctx.reader).await.unwrap();

        fx.ctx.export_scene(scene[0].clone()).await.unwrap();

        assert!(fx.ctx.selectors.studios.ids().is_empty());
        assert!(fx.ctx.selectors.tags.ids().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_dependencies_alone() {
        let pool = scene_library().await;
        let fx = fixture(pool, true).await;
        let scene: Vec<Scene> = RowSource::<Scene>::all(&*fx.ctx.reader).await.unwrap();
        std::fs::remove_dir_all(fx.ctx.paths.kind_dir(EntityKind::Scene)).unwrap();

        let err = fx.ctx.export_scene(scene[0].clone()).await.unwrap_err();
        assert_eq!(err.context, "failed to save json");

        let deps = &fx.ctx.selectors;
        assert!(deps.studios.ids().is_empty());
        assert!(deps.tags.ids().is_empty());
        assert!(deps.performers.ids().is_empty());
        assert!(deps.movies.ids().is_empty());
        assert!(deps.galleries.ids().is_empty());
    }

    #[tokio::test]
    async fn test_dangling_studio_fails_item() {
        let pool = seed::memory_pool().await;
        seed::image(&pool, 1, Some("orphan"), Some(99)).await;
        let fx = fixture(pool, false).await;
        let images: Vec<Image> = RowSource::<Image>::all(&*fx.ctx.reader).await.unwrap();

        let err = fx.ctx.export_image(images[0].clone()).await.unwrap_err();
        assert_eq!(err.subject, "orphan");
        assert_eq!(err.context, "error getting image studio name");
        assert!(read_dir(&fx.ctx.paths.kind_dir(EntityKind::Image)).is_empty());
    }

    #[tokio::test]
    async fn test_gallery_writes_folder_side_document() {
        let pool = seed::memory_pool().await;
        seed::folder(&pool, 5, "/media/albums/summer").await;
        seed::gallery(&pool, 1, None, None, Some(5)).await;
        let fx = fixture(pool, false).await;
        let galleries: Vec<Gallery> = RowSource::<Gallery>::all(&*fx.ctx.reader).await.unwrap();

        fx.ctx.export_gallery(galleries[0].clone()).await.unwrap();

        assert_eq!(read_dir(&fx.ctx.paths.kind_dir(EntityKind::Gallery)), vec!["summer.1.json"]);
        let folders = read_dir(&fx.ctx.paths.folders_dir());
        assert_eq!(folders.len(), 1);
        assert!(folders[0].starts_with("03.summer."));
    }

    #[tokio::test]
    async fn test_tag_and_studio_documents() {
        let pool = seed::memory_pool().await;
        seed::studio(&pool, 1, "Parent").await;
        seed::studio(&pool, 2, "Child").await;
        seed::exec(&pool, "UPDATE studios SET parent_id = 1 WHERE id = 2").await;
        seed::exec(&pool, "INSERT INTO studio_aliases (studio_id, alias) VALUES (2, 'Kid')").await;
        seed::tag(&pool, 1, "nature").await;
        seed::tag(&pool, 2, "forest").await;
        seed::link(&pool, "tags_relations", "parent_id", 1, "child_id", 2).await;
        let fx = fixture(pool, false).await;

        let studios: Vec<Studio> = RowSource::<Studio>::find_many(&*fx.ctx.reader, &[2]).await.unwrap();
        fx.ctx.export_studio(studios[0].clone()).await.unwrap();
        let tags: Vec<Tag> = RowSource::<Tag>::find_many(&*fx.ctx.reader, &[2]).await.unwrap();
        fx.ctx.export_tag(tags[0].clone()).await.unwrap();

        let studio_dir = fx.ctx.paths.kind_dir(EntityKind::Studio);
        let studio: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(studio_dir.join("Child.2.json")).unwrap()).unwrap();
        assert_eq!(studio["parent_studio"], "Parent");
        assert_eq!(studio["aliases"][0], "Kid");

        let tag_dir = fx.ctx.paths.kind_dir(EntityKind::Tag);
        let tag: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(tag_dir.join("forest.2.json")).unwrap()).unwrap();
        assert_eq!(tag["parents"][0], "nature");
    }
}
