//! Filesystem adapters: question documents and the file store.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use qti_model::{FieldKey, Question, questions_from_json};
use qti_output::{AssetResolver, decode_text};

/// Read a question document in any supported encoding.
pub fn load_questions(path: &Path) -> Result<Vec<Question>> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let text = decode_text(&bytes);
    let questions =
        questions_from_json(&text).with_context(|| format!("decode {}", path.display()))?;
    debug!(path = %path.display(), count = questions.len(), "loaded questions");
    Ok(questions)
}

/// File store laid out as `{root}/{storage_area}/{field}/{owner_id}/{filename}`.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a stored file.
    ///
    /// Names that would leave the owner's directory are rejected.
    pub fn path_for(
        &self,
        storage_area: u64,
        field: FieldKey,
        owner_id: u64,
        filename: &str,
    ) -> io::Result<PathBuf> {
        let relative = Path::new(filename);
        let plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if filename.is_empty() || !plain {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsafe file name '{filename}'"),
            ));
        }
        Ok(self
            .root
            .join(storage_area.to_string())
            .join(field.as_str())
            .join(owner_id.to_string())
            .join(relative))
    }
}

impl AssetResolver for DirectoryResolver {
    fn resolve(
        &self,
        storage_area: u64,
        field: FieldKey,
        owner_id: u64,
        filename: &str,
    ) -> io::Result<Vec<u8>> {
        let path = self.path_for(storage_area, field, owner_id, filename)?;
        fs::read(&path)
            .map_err(|error| io::Error::new(error.kind(), format!("{}: {error}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_storage_layout() {
        let resolver = DirectoryResolver::new("/store");
        let path = resolver
            .path_for(12, FieldKey::AnswerFeedback, 7, "diagram.png")
            .unwrap();
        assert_eq!(path, PathBuf::from("/store/12/answerfeedback/7/diagram.png"));
    }

    #[test]
    fn test_traversal_is_rejected() {
        let resolver = DirectoryResolver::new("/store");
        for name in ["../secret", "/etc/passwd", "", "a/../../b"] {
            let error = resolver
                .path_for(1, FieldKey::QuestionText, 1, name)
                .unwrap_err();
            assert_eq!(error.kind(), io::ErrorKind::InvalidInput, "{name}");
        }
    }

    #[test]
    fn test_resolves_stored_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("3/questiontext/40");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("a b.png"), b"png").unwrap();

        let resolver = DirectoryResolver::new(dir.path());
        assert_eq!(
            resolver.resolve(3, FieldKey::QuestionText, 40, "a b.png").unwrap(),
            b"png"
        );
        let missing = resolver
            .resolve(3, FieldKey::QuestionText, 41, "a b.png")
            .unwrap_err();
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_loads_windows_1252_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.json");
        let mut bytes = br#"[{"id": 1, "name": "Caf"#.to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(br#"", "qtype": "essay"}]"#);
        fs::write(&path, bytes).unwrap();

        let questions = load_questions(&path).unwrap();
        assert_eq!(questions[0].name, "Café");
    }
}
