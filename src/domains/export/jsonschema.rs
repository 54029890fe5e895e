//! On-disk document shapes, one per exported entity type, plus the
//! file/folder side-documents. Documents carry names instead of row ids.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::domains::library::{File, Fingerprint, Folder};
use crate::types::EntityId;

/// Hex characters of the path digest kept in side-document names
const PATH_HASH_LEN: usize = 32;

/// Byte budget for the name part of a document file name, leaving room for
/// the hash and id suffixes under common 255-byte file name limits
const MAX_STEM_BYTES: usize = 200;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]+"#).unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Make a display name safe to use as part of a file name
pub fn sanitize_basename(name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(name.trim(), "-");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c == '-' || c == ' ');
    clip_stem(trimmed).to_string()
}

/// Cut to `MAX_STEM_BYTES` on a char boundary
fn clip_stem(stem: &str) -> &str {
    if stem.len() <= MAX_STEM_BYTES {
        return stem;
    }
    let mut end = MAX_STEM_BYTES;
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    stem[..end].trim_end_matches(|c: char| c == '.' || c == '-' || c == ' ')
}

/// `<a>.<b>...json`, skipping empty parts
fn document_name(parts: &[&str]) -> String {
    let mut name = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".");
    name.push_str(".json");
    name
}

/// Last path component, empty when there is none
pub fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn title_or<'a>(title: &'a str, fallback: &'a str) -> String {
    let sanitized = sanitize_basename(title);
    if sanitized.is_empty() {
        sanitize_basename(fallback)
    } else {
        sanitized
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Reference to a gallery from a scene or image document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryRef {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub zip_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneMarkerJson {
    pub title: String,
    pub seconds: String,
    pub primary_tag: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneMovieJson {
    pub movie_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_index: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryChapterJson {
    pub title: String,
    pub image_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SceneJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub studio: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(skip_serializing_if = "is_false")]
    pub organized: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub o_counter: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub galleries: Vec<GalleryRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub performers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub movies: Vec<SceneMovieJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<SceneMarkerJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    pub resume_time: f64,
    pub play_count: i64,
    pub play_duration: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SceneJson {
    /// `<title or file basename>[.<hash>].<id>.json`. Duplicate files share a
    /// hash, so the id is always present.
    pub fn filename(&self, id: EntityId, basename: &str, hash: Option<&str>) -> String {
        let stem = title_or(self.title.as_deref().unwrap_or_default(), basename);
        document_name(&[&stem, hash.unwrap_or_default(), &id.to_string()])
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImageJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub studio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photographer: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub organized: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub o_counter: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub galleries: Vec<GalleryRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub performers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ImageJson {
    /// `<title or file basename>[.<checksum>].<id>.json`
    pub fn filename(&self, id: EntityId, basename: &str, checksum: Option<&str>) -> String {
        let stem = title_or(self.title.as_deref().unwrap_or_default(), basename);
        document_name(&[&stem, checksum.unwrap_or_default(), &id.to_string()])
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GalleryJson {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub zip_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photographer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(skip_serializing_if = "is_false")]
    pub organized: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chapters: Vec<GalleryChapterJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub studio: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub performers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl GalleryJson {
    /// `<title or path basename>.<id>.json`. The id keeps galleries with the
    /// same folder or zip name apart.
    pub fn filename(&self, id: EntityId, basename: &str) -> String {
        let stem = title_or(self.title.as_deref().unwrap_or_default(), basename);
        document_name(&[&stem, &id.to_string()])
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformerJson {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disambiguation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub favorite: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PerformerJson {
    /// `<name>[_<disambiguation>].<id>.json`
    pub fn filename(&self, id: EntityId) -> String {
        let mut stem = sanitize_basename(&self.name);
        if let Some(d) = self.disambiguation.as_deref().map(sanitize_basename) {
            if !d.is_empty() {
                stem = format!("{}_{}", stem, d);
            }
        }
        document_name(&[clip_stem(&stem), &id.to_string()])
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StudioJson {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_studio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub favorite: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StudioJson {
    pub fn filename(&self, id: EntityId) -> String {
        document_name(&[&sanitize_basename(&self.name), &id.to_string()])
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TagJson {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub ignore_auto_tag: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub favorite: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TagJson {
    pub fn filename(&self, id: EntityId) -> String {
        document_name(&[&sanitize_basename(&self.name), &id.to_string()])
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MovieJson {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub studio: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MovieJson {
    pub fn filename(&self, id: EntityId) -> String {
        document_name(&[&sanitize_basename(&self.name), &id.to_string()])
    }
}

// --- file and folder side-documents ---

#[derive(Debug, Clone, Serialize)]
pub struct DirEntryBase {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_file: Option<String>,
    pub mod_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaseFileJson {
    #[serde(flatten)]
    pub entry: DirEntryBase,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fingerprints: Vec<Fingerprint>,
    pub size: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoFileJson {
    #[serde(flatten)]
    pub file: BaseFileJson,
    pub format: String,
    pub width: i64,
    pub height: i64,
    pub duration: f64,
    pub video_codec: String,
    pub audio_codec: String,
    pub frame_rate: f64,
    pub bit_rate: i64,
    pub interactive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive_speed: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageFileJson {
    #[serde(flatten)]
    pub file: BaseFileJson,
    pub format: String,
    pub width: i64,
    pub height: i64,
}

/// Side-document for one folder or file, tagged by kind
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DirEntryJson {
    Folder(DirEntryBase),
    File(BaseFileJson),
    Video(VideoFileJson),
    Image(ImageFileJson),
}

impl DirEntryJson {
    fn entry(&self) -> &DirEntryBase {
        match self {
            DirEntryJson::Folder(e) => e,
            DirEntryJson::File(f) => &f.entry,
            DirEntryJson::Video(v) => &v.file.entry,
            DirEntryJson::Image(i) => &i.file.entry,
        }
    }

    pub fn path(&self) -> &str {
        &self.entry().path
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, DirEntryJson::Folder(_))
    }

    /// `<depth>.<basename>.<path hash>.json`. Depth first so shallower
    /// entries sort ahead of the entries they contain.
    pub fn filename(&self) -> String {
        let path = self.path();
        let depth = path.matches(['/', '\\']).count();
        let digest = hex::encode(Sha256::digest(path.as_bytes()));
        let hash = &digest[..PATH_HASH_LEN];
        format!("{:02x}.{}.{}.json", depth, sanitize_basename(&base_name(path)), hash)
    }
}

impl From<&Folder> for DirEntryJson {
    fn from(folder: &Folder) -> Self {
        DirEntryJson::Folder(DirEntryBase {
            path: folder.path.clone(),
            zip_file: folder.zip_file_path.clone(),
            mod_time: folder.mod_time,
            created_at: folder.created_at,
            updated_at: folder.updated_at,
        })
    }
}

impl From<&File> for DirEntryJson {
    fn from(file: &File) -> Self {
        let base = file.base();
        let file_json = BaseFileJson {
            entry: DirEntryBase {
                path: base.path.clone(),
                zip_file: base.zip_file_path.clone(),
                mod_time: base.mod_time,
                created_at: base.created_at,
                updated_at: base.updated_at,
            },
            fingerprints: base.fingerprints.clone(),
            size: base.size,
        };

        match file {
            File::Video(v) => DirEntryJson::Video(VideoFileJson {
                file: file_json,
                format: v.format.clone(),
                width: v.width,
                height: v.height,
                duration: v.duration,
                video_codec: v.video_codec.clone(),
                audio_codec: v.audio_codec.clone(),
                frame_rate: v.frame_rate,
                bit_rate: v.bit_rate,
                interactive: v.interactive,
                interactive_speed: v.interactive_speed,
            }),
            File::Image(i) => DirEntryJson::Image(ImageFileJson {
                file: file_json,
                format: i.format.clone(),
                width: i.width,
                height: i.height,
            }),
            File::Other(_) => DirEntryJson::File(file_json),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::library::{BaseFile, ImageFile};

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_sanitize_basename() {
        assert_eq!(sanitize_basename("  My  Scene  "), "My Scene");
        assert_eq!(sanitize_basename("a/b\\c:d"), "a-b-c-d");
        assert_eq!(sanitize_basename("..hidden"), "hidden");
        assert_eq!(sanitize_basename("???"), "");
    }

    #[test]
    fn test_scene_filename_keeps_id_next_to_hash() {
        let doc = SceneJson { title: Some("Beach Day".into()), ..Default::default() };
        assert_eq!(doc.filename(7, "clip.mp4", Some("abc123")), "Beach Day.abc123.7.json");
        assert_eq!(doc.filename(7, "clip.mp4", None), "Beach Day.7.json");
        assert_ne!(doc.filename(7, "clip.mp4", Some("abc123")), doc.filename(8, "clip.mp4", Some("abc123")));

        let untitled = SceneJson::default();
        assert_eq!(untitled.filename(7, "clip.mp4", Some("")), "clip.mp4.7.json");

        let image = ImageJson { title: Some("Shot".into()), ..Default::default() };
        assert_eq!(image.filename(2, "a.jpg", Some("ff00")), "Shot.ff00.2.json");
    }

    #[test]
    fn test_long_names_are_clipped() {
        let title = "é".repeat(150);
        let doc = SceneJson { title: Some(title), ..Default::default() };
        let name = doc.filename(1, "clip.mp4", Some("abc123"));
        assert!(name.len() <= MAX_STEM_BYTES + ".abc123.1.json".len());
        assert!(name.ends_with(".abc123.1.json"));

        let performer = PerformerJson {
            name: "n".repeat(300),
            disambiguation: Some("d".repeat(300)),
            ..Default::default()
        };
        assert_eq!(performer.filename(4).len(), MAX_STEM_BYTES + ".4.json".len());
    }

    #[test]
    fn test_same_name_distinct_ids() {
        let a = StudioJson { name: "Acme".into(), ..Default::default() };
        let b = StudioJson { name: "Acme".into(), ..Default::default() };
        assert_ne!(a.filename(1), b.filename(2));

        let p = PerformerJson {
            name: "Jane".into(),
            disambiguation: Some("II".into()),
            ..Default::default()
        };
        assert_eq!(p.filename(3), "Jane_II.3.json");
    }

    #[test]
    fn test_dir_entry_filename_and_shape() {
        let file = File::Image(ImageFile {
            base: BaseFile {
                id: 1,
                path: "/media/pics/one.jpg".into(),
                size: 10,
                mod_time: ts(),
                zip_file_path: None,
                fingerprints: vec![Fingerprint { kind: "md5".into(), fingerprint: "ff".into() }],
                created_at: ts(),
                updated_at: ts(),
            },
            format: "jpeg".into(),
            width: 4,
            height: 3,
        });
        let doc = DirEntryJson::from(&file);

        let name = doc.filename();
        assert!(name.starts_with("03.one.jpg."));
        assert!(name.ends_with(".json"));
        assert_eq!(name, DirEntryJson::from(&file).filename());

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["type"], "image");
        assert_eq!(value["path"], "/media/pics/one.jpg");
        assert_eq!(value["fingerprints"][0]["type"], "md5");
        assert_eq!(value["width"], 4);
    }
}
