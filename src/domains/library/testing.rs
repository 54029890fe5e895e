use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::db_migration::initialize_database;
use crate::types::EntityId;

/// Fixed timestamp so exported documents are byte-stable across runs
pub const TS: &str = "2024-01-01T00:00:00Z";

/// Fresh migrated in-memory library. One connection keeps the database alive.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    initialize_database(&pool).await.unwrap();
    pool
}

pub async fn exec(pool: &SqlitePool, sql: &str) {
    sqlx::query(sql).execute(pool).await.unwrap();
}

pub async fn studio(pool: &SqlitePool, id: EntityId, name: &str) {
    sqlx::query("INSERT INTO studios (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(TS)
        .bind(TS)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn tag(pool: &SqlitePool, id: EntityId, name: &str) {
    sqlx::query("INSERT INTO tags (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(TS)
        .bind(TS)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn performer(pool: &SqlitePool, id: EntityId, name: &str, disambiguation: Option<&str>) {
    sqlx::query(
        "INSERT INTO performers (id, name, disambiguation, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(disambiguation)
    .bind(TS)
    .bind(TS)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn movie(pool: &SqlitePool, id: EntityId, name: &str, studio_id: Option<EntityId>) {
    sqlx::query("INSERT INTO movies (id, name, studio_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(studio_id)
        .bind(TS)
        .bind(TS)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn scene(pool: &SqlitePool, id: EntityId, title: Option<&str>, studio_id: Option<EntityId>) {
    sqlx::query("INSERT INTO scenes (id, title, studio_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(title)
        .bind(studio_id)
        .bind(TS)
        .bind(TS)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn image(pool: &SqlitePool, id: EntityId, title: Option<&str>, studio_id: Option<EntityId>) {
    sqlx::query("INSERT INTO images (id, title, studio_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(title)
        .bind(studio_id)
        .bind(TS)
        .bind(TS)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn gallery(
    pool: &SqlitePool,
    id: EntityId,
    title: Option<&str>,
    studio_id: Option<EntityId>,
    folder_id: Option<EntityId>,
) {
    sqlx::query(
        "INSERT INTO galleries (id, title, studio_id, folder_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(title)
    .bind(studio_id)
    .bind(folder_id)
    .bind(TS)
    .bind(TS)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn folder(pool: &SqlitePool, id: EntityId, path: &str) {
    sqlx::query("INSERT INTO folders (id, path, mod_time, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(path)
        .bind(TS)
        .bind(TS)
        .bind(TS)
        .execute(pool)
        .await
        .unwrap();
}

/// Plain file row. Add a `video_files` or `image_files` row to specialise it.
pub async fn file(pool: &SqlitePool, id: EntityId, folder_id: EntityId, basename: &str) {
    sqlx::query(
        "INSERT INTO files (id, basename, parent_folder_id, size, mod_time, created_at, updated_at) \
         VALUES (?, ?, ?, 1024, ?, ?, ?)",
    )
    .bind(id)
    .bind(basename)
    .bind(folder_id)
    .bind(TS)
    .bind(TS)
    .bind(TS)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn video_file(pool: &SqlitePool, id: EntityId, folder_id: EntityId, basename: &str) {
    file(pool, id, folder_id, basename).await;
    sqlx::query(
        "INSERT INTO video_files (file_id, format, width, height, duration, video_codec, audio_codec, frame_rate, bit_rate) \
         VALUES (?, 'mp4', 1920, 1080, 60.0, 'h264', 'aac', 30.0, 5000000)",
    )
    .bind(id)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn image_file(pool: &SqlitePool, id: EntityId, folder_id: EntityId, basename: &str) {
    file(pool, id, folder_id, basename).await;
    sqlx::query("INSERT INTO image_files (file_id, format, width, height) VALUES (?, 'jpeg', 800, 600)")
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn fingerprint(pool: &SqlitePool, file_id: EntityId, kind: &str, value: &str) {
    sqlx::query("INSERT INTO files_fingerprints (file_id, type, fingerprint) VALUES (?, ?, ?)")
        .bind(file_id)
        .bind(kind)
        .bind(value)
        .execute(pool)
        .await
        .unwrap();
}

/// Two-column join-table row, e.g. `link(pool, "scenes_tags", "scene_id", 1, "tag_id", 2)`
pub async fn link(pool: &SqlitePool, table: &str, left: &str, left_id: EntityId, right: &str, right_id: EntityId) {
    let sql = format!("INSERT INTO {table} ({left}, {right}) VALUES (?, ?)");
    sqlx::query(&sql)
        .bind(left_id)
        .bind(right_id)
        .execute(pool)
        .await
        .unwrap();
}
