use crate::domains::library::{Entity, Gallery, LibraryReader, Movie};

use super::selector::ExportSelectors;

/// Widen the scene and image selectors before any pool starts.
///
/// Movies pull in their scenes only when dependencies are requested.
/// Galleries always pull in their images on a partial export. Neither runs
/// for a full export, and neither touches a selector already set to "all".
pub async fn expand(selectors: &ExportSelectors, reader: &dyn LibraryReader, full: bool, include_dependencies: bool) {
    if full {
        return;
    }

    if include_dependencies && !selectors.scenes.is_all() {
        populate_movie_scenes(selectors, reader).await;
    }

    if !selectors.images.is_all() {
        populate_gallery_images(selectors, reader).await;
    }
}

async fn populate_movie_scenes(selectors: &ExportSelectors, reader: &dyn LibraryReader) {
    let movies: Vec<Movie> = selectors.movies.resolve(false, reader).await;

    for movie in movies {
        match reader.find_scenes_by_movie(movie.id).await {
            Ok(scenes) => selectors.scenes.extend(scenes.iter().map(|s| s.id)),
            Err(e) => log::error!("[movies] <{}> failed to fetch scenes for movie: {}", movie.name, e),
        }
    }
}

async fn populate_gallery_images(selectors: &ExportSelectors, reader: &dyn LibraryReader) {
    let galleries: Vec<Gallery> = selectors.galleries.resolve(false, reader).await;

    for gallery in galleries {
        match reader.find_images_by_gallery(gallery.id).await {
            Ok(images) => selectors.images.extend(images.iter().map(|i| i.id)),
            Err(e) => log::error!(
                "[galleries] <{}> failed to fetch images for gallery: {}",
                gallery.display_name(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::export::types::{ExportObjectTypeInput, ExportObjectsInput};
    use crate::domains::library::testing as seed;
    use crate::domains::library::{LibraryStore, SqliteLibrary};

    async fn library() -> SqliteLibrary {
        let pool = seed::memory_pool().await;
        seed::movie(&pool, 1, "Feature", None).await;
        for id in 1..=4 {
            seed::scene(&pool, id, None, None).await;
        }
        seed::link(&pool, "movies_scenes", "movie_id", 1, "scene_id", 1).await;
        seed::link(&pool, "movies_scenes", "movie_id", 1, "scene_id", 2).await;

        seed::gallery(&pool, 1, Some("Album"), None, None).await;
        seed::image(&pool, 1, None, None).await;
        seed::image(&pool, 2, None, None).await;
        seed::link(&pool, "galleries_images", "gallery_id", 1, "image_id", 2).await;
        SqliteLibrary::new(pool)
    }

    fn input(include_dependencies: bool) -> ExportObjectsInput {
        ExportObjectsInput {
            scenes: Some(ExportObjectTypeInput::ids([4])),
            movies: Some(ExportObjectTypeInput::ids([1])),
            galleries: Some(ExportObjectTypeInput::ids([1])),
            include_dependencies: Some(include_dependencies),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_movie_scenes_need_dependencies() {
        let library = library().await;
        let reader = library.begin_read().await.unwrap();

        let selectors = ExportSelectors::from_input(&input(false));
        expand(&selectors, &*reader, false, false).await;
        assert_eq!(selectors.scenes.ids(), vec![4]);

        let selectors = ExportSelectors::from_input(&input(true));
        expand(&selectors, &*reader, false, true).await;
        assert_eq!(selectors.scenes.ids(), vec![1, 2, 4]);

        reader.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_gallery_images_always_expand_for_partial_exports() {
        let library = library().await;
        let reader = library.begin_read().await.unwrap();

        let selectors = ExportSelectors::from_input(&input(false));
        expand(&selectors, &*reader, false, false).await;
        assert_eq!(selectors.images.ids(), vec![2]);

        let selectors = ExportSelectors::from_input(&input(true));
        expand(&selectors, &*reader, true, true).await;
        assert!(selectors.images.ids().is_empty());
        assert_eq!(selectors.scenes.ids(), vec![4]);

        reader.release().await.unwrap();
    }
}
