use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::errors::DomainResult;

/// Writes one pretty-printed JSON document per call.
///
/// Calls are independent, so workers may save concurrently. Saving to an
/// existing name replaces the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentWriter;

impl DocumentWriter {
    pub fn save<T: Serialize + ?Sized>(&self, dir: &Path, name: &str, document: &T) -> DomainResult<()> {
        let bytes = serde_json::to_vec_pretty(document)?;
        let mut file = std::fs::File::create(dir.join(name))?;
        file.write_all(&bytes)?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DocumentWriter;

        writer.save(dir.path(), "a.json", &json!({ "name": "first" })).unwrap();
        writer.save(dir.path(), "a.json", &json!({ "name": "second" })).unwrap();

        let text = std::fs::read_to_string(dir.path().join("a.json")).unwrap();
        assert!(text.contains("second"));
        assert!(!text.contains("first"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_save_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = DocumentWriter.save(&dir.path().join("nope"), "a.json", &json!({}));
        assert!(result.is_err());
    }
}
