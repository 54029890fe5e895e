use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::errors::{DomainError, DomainResult};

use super::paths::JsonPaths;

/// Counters from one packaging run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackSummary {
    pub entries: usize,
    /// Directories that could not be listed
    pub skipped_dirs: usize,
    /// Files that could not be added
    pub skipped_entries: usize,
}

/// Pack every owned directory under `paths` into a zip written to `sink`.
///
/// Each regular file becomes `<dir>/<basename>`. A directory that cannot be
/// listed or a file that cannot be read is logged and skipped, and the rest
/// of the tree is still packed. Only finalizing the archive is fatal.
pub fn pack<W: Write + Seek>(paths: &JsonPaths, sink: W) -> DomainResult<(W, PackSummary)> {
    let mut zip = ZipWriter::new(sink);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut summary = PackSummary::default();

    for dir_name in JsonPaths::dir_names() {
        let dir = paths.root().join(dir_name);
        let mut files = Vec::new();
        collect_files(&dir, &mut files, &mut summary);
        add_files(&mut zip, dir_name, &files, options, &mut summary);
    }

    let sink = zip.finish()?;
    Ok((sink, summary))
}

/// Regular files under `path`, depth first with children in name order
fn collect_files(path: &Path, files: &mut Vec<PathBuf>, summary: &mut PackSummary) {
    let children = match std::fs::read_dir(path).and_then(|dir| dir.collect::<Result<Vec<_>, _>>()) {
        Ok(children) => children,
        Err(e) => {
            log::warn!("error walking structure {}: {}", path.display(), e);
            summary.skipped_dirs += 1;
            return;
        }
    };

    let mut children: Vec<PathBuf> = children.into_iter().map(|entry| entry.path()).collect();
    children.sort();

    for child in children {
        if child.is_dir() {
            collect_files(&child, files, summary);
        } else if child.is_file() {
            files.push(child);
        }
    }
}

fn add_files<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    out_dir: &str,
    files: &[PathBuf],
    options: FileOptions,
    summary: &mut PackSummary,
) {
    for path in files {
        match add_file(zip, out_dir, path, options) {
            Ok(()) => summary.entries += 1,
            Err(e) => {
                log::warn!("error adding {} to archive: {}", path.display(), e);
                summary.skipped_entries += 1;
            }
        }
    }
}

fn add_file<W: Write + Seek>(zip: &mut ZipWriter<W>, out_dir: &str, path: &Path, options: FileOptions) -> DomainResult<()> {
    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| DomainError::Archive(format!("no file name in {}", path.display())))?;
    let name = format!("{}/{}", out_dir, basename);

    // open first so an unreadable file leaves no empty entry behind
    let mut file = std::fs::File::open(path)?;
    zip.start_file(name, options)
        .map_err(|e| DomainError::Archive(format!("error creating zip entry for {}: {}", path.display(), e)))?;
    std::io::copy(&mut file, zip)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    #[test]
    fn test_pack_three_files_in_two_dirs() {
        let root = tempfile::tempdir().unwrap();
        let paths = JsonPaths::new(root.path());
        paths.ensure_dirs().unwrap();

        std::fs::write(root.path().join("scenes/a.json"), "{\"a\":1}").unwrap();
        std::fs::write(root.path().join("scenes/b.json"), "{}").unwrap();
        std::fs::write(root.path().join("tags/c.json"), "{}").unwrap();

        let (cursor, summary) = pack(&paths, Cursor::new(Vec::new())).unwrap();
        assert_eq!(summary, PackSummary { entries: 3, skipped_dirs: 0, skipped_entries: 0 });

        let mut archive = ZipArchive::new(cursor).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, vec!["scenes/a.json", "scenes/b.json", "tags/c.json"]);

        let mut content = String::new();
        archive.by_name("scenes/a.json").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "{\"a\":1}");
    }

    #[test]
    fn test_nested_files_are_flattened() {
        let root = tempfile::tempdir().unwrap();
        let paths = JsonPaths::new(root.path());
        paths.ensure_dirs().unwrap();
        std::fs::create_dir_all(root.path().join("images/nested")).unwrap();
        std::fs::write(root.path().join("images/nested/x.json"), "{}").unwrap();

        let (cursor, _) = pack(&paths, Cursor::new(Vec::new())).unwrap();
        let archive = ZipArchive::new(cursor).unwrap();
        assert_eq!(archive.file_names().collect::<Vec<_>>(), vec!["images/x.json"]);
    }

    #[test]
    fn test_missing_dirs_are_warnings() {
        let root = tempfile::tempdir().unwrap();
        let paths = JsonPaths::new(root.path());
        std::fs::create_dir_all(root.path().join("movies")).unwrap();
        std::fs::write(root.path().join("movies/m.json"), "{}").unwrap();

        let (cursor, summary) = pack(&paths, Cursor::new(Vec::new())).unwrap();
        assert_eq!(summary.entries, 1);
        assert_eq!(summary.skipped_dirs, 8);
        assert_eq!(ZipArchive::new(cursor).unwrap().len(), 1);
    }

    #[test]
    fn test_unreadable_file_does_not_stop_the_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("scenes");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.json"), "{}").unwrap();
        std::fs::write(dir.join("c.json"), "{}").unwrap();

        // b.json was listed but removed before it could be read
        let files = vec![dir.join("a.json"), dir.join("b.json"), dir.join("c.json")];
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let mut summary = PackSummary::default();
        add_files(&mut zip, "scenes", &files, FileOptions::default(), &mut summary);

        assert_eq!(summary.entries, 2);
        assert_eq!(summary.skipped_entries, 1);
        let archive = ZipArchive::new(zip.finish().unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, vec!["scenes/a.json", "scenes/c.json"]);
    }
}
