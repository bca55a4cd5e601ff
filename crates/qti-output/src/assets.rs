//! Relocation of embedded files.
//!
//! Host text points at stored files through `@@PLUGINFILE@@/name` markers.
//! Each marker is rewritten to a flat archive path under [`ASSET_DIR`] and the
//! file's bytes are fetched for copying next to the item.

use std::collections::BTreeSet;

use qti_model::{FieldKey, FieldVisitor, Question, walk_question_mut};
use tracing::{debug, warn};

use crate::error::{ExportError, Result};

/// Marker preceding stored file names in host text.
pub const PLUGINFILE_MARKER: &str = "@@PLUGINFILE@@/";

/// Archive directory receiving relocated files.
pub const ASSET_DIR: &str = "images";

/// Characters replaced in relocated file names.
const UNSAFE_NAME_CHARS: [char; 10] = ['/', '\\', '"', '\'', '<', '>', '&', '#', '?', '%'];

/// File storage consulted for the bytes of embedded files.
pub trait AssetResolver {
    /// Fetch `filename` as stored for the given field of `owner_id` in
    /// `storage_area`.
    fn resolve(
        &self,
        storage_area: u64,
        field: FieldKey,
        owner_id: u64,
        filename: &str,
    ) -> std::io::Result<Vec<u8>>;
}

/// An embedded file discovered in one text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    /// Stored file name, URL-decoded.
    pub filename: String,
    pub field: FieldKey,
    pub owner_id: u64,
}

impl AssetReference {
    /// Name of the file inside [`ASSET_DIR`]: `{field}-{owner}-{name}`.
    ///
    /// Whitespace and control characters are removed. Path separators and
    /// characters with a meaning in markup or URLs become `_`, so the name is
    /// a single path segment that can be written verbatim into an attribute.
    pub fn target_name(&self) -> String {
        let safe: String = self
            .filename
            .chars()
            .filter(|c| !c.is_whitespace() && !c.is_control())
            .map(|c| if UNSAFE_NAME_CHARS.contains(&c) { '_' } else { c })
            .collect();
        format!("{}-{}-{safe}", self.field, self.owner_id)
    }

    /// Archive path of the relocated file.
    pub fn target_path(&self) -> String {
        format!("{ASSET_DIR}/{}", self.target_name())
    }
}

/// Bytes to be written into the archive for one relocated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCopy {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// Outcome of rewriting one question.
#[derive(Debug, Default)]
pub struct RelocatedAssets {
    /// One copy per distinct target path, in discovery order.
    pub copies: Vec<AssetCopy>,
    /// Markers left untouched because their file name could not be read.
    pub unresolved: usize,
}

/// Rewrite every embedded file reference of `question` in place.
///
/// `question.context_id` names the storage area for the question and all of
/// its sub-questions. Resolution failures abort the rewrite.
pub fn relocate_assets<R: AssetResolver + ?Sized>(
    question: &mut Question,
    resolver: &R,
) -> Result<RelocatedAssets> {
    let mut rewriter = AssetRewriter::new(resolver, question.context_id);
    walk_question_mut(question, &mut rewriter)?;
    Ok(rewriter.finish())
}

/// Field visitor performing the rewrite.
pub struct AssetRewriter<'r, R: ?Sized> {
    resolver: &'r R,
    storage_area: u64,
    seen: BTreeSet<String>,
    relocated: RelocatedAssets,
}

impl<'r, R: AssetResolver + ?Sized> AssetRewriter<'r, R> {
    pub fn new(resolver: &'r R, storage_area: u64) -> Self {
        Self {
            resolver,
            storage_area,
            seen: BTreeSet::new(),
            relocated: RelocatedAssets::default(),
        }
    }

    pub fn finish(self) -> RelocatedAssets {
        self.relocated
    }

    fn request(&mut self, reference: &AssetReference) -> Result<String> {
        let path = reference.target_path();
        if !self.seen.insert(path.clone()) {
            debug!(%path, "file already queued");
            return Ok(path);
        }
        let bytes = self
            .resolver
            .resolve(
                self.storage_area,
                reference.field,
                reference.owner_id,
                &reference.filename,
            )
            .map_err(|source| ExportError::AssetResolution {
                filename: reference.filename.clone(),
                field: reference.field,
                owner_id: reference.owner_id,
                source,
            })?;
        debug!(%path, size = bytes.len(), "relocated embedded file");
        self.relocated.copies.push(AssetCopy {
            path: path.clone(),
            bytes,
        });
        Ok(path)
    }
}

impl<R: AssetResolver + ?Sized> FieldVisitor for AssetRewriter<'_, R> {
    type Error = ExportError;

    fn visit_field(&mut self, key: FieldKey, owner_id: u64, value: &mut String) -> Result<()> {
        if !value.contains(PLUGINFILE_MARKER) {
            return Ok(());
        }
        let mut rewritten = String::with_capacity(value.len());
        let mut rest = value.as_str();
        while let Some(position) = rest.find(PLUGINFILE_MARKER) {
            rewritten.push_str(&rest[..position]);
            let after = &rest[position + PLUGINFILE_MARKER.len()..];
            let Some(end) = after.find(['"', '\'']).filter(|&end| end > 0) else {
                warn!(field = %key, owner_id, "embedded file reference without a file name, left unchanged");
                self.relocated.unresolved += 1;
                rewritten.push_str(&rest[position..]);
                rest = "";
                break;
            };
            let raw_name = &after[..end];
            let filename = urlencoding::decode(raw_name)
                .map(|name| name.into_owned())
                .unwrap_or_else(|_| raw_name.to_string());
            let reference = AssetReference {
                filename,
                field: key,
                owner_id,
            };
            rewritten.push_str(&self.request(&reference)?);
            rest = &after[end..];
        }
        rewritten.push_str(rest);
        *value = rewritten;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io;

    use qti_model::{Answer, ChoiceOptions, CombinedFeedback, QuestionKind};

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        files: BTreeMap<(u64, FieldKey, u64, String), Vec<u8>>,
    }

    impl MemoryStore {
        fn with(mut self, area: u64, field: FieldKey, owner: u64, name: &str, bytes: &[u8]) -> Self {
            self.files
                .insert((area, field, owner, name.to_string()), bytes.to_vec());
            self
        }
    }

    impl AssetResolver for MemoryStore {
        fn resolve(&self, area: u64, field: FieldKey, owner: u64, name: &str) -> io::Result<Vec<u8>> {
            self.files
                .get(&(area, field, owner, name.to_string()))
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))
        }
    }

    fn question(text: &str, answer_feedback: &str) -> Question {
        Question::new(
            7,
            "pic",
            text,
            QuestionKind::MultiChoice(ChoiceOptions {
                single: true,
                shuffle_answers: false,
                answers: vec![Answer::new(70, "x", 1.0).with_feedback(answer_feedback)],
                feedback: CombinedFeedback::default(),
            }),
        )
        .with_context_id(3)
    }

    #[test]
    fn rewrites_markers_and_collects_files() {
        let store = MemoryStore::default().with(3, FieldKey::QuestionText, 7, "my pic.png", b"png");
        let mut question = question(r#"<img src="@@PLUGINFILE@@/my%20pic.png" alt="a">"#, "");
        let relocated = relocate_assets(&mut question, &store).unwrap();

        assert_eq!(
            question.text,
            r#"<img src="images/questiontext-7-mypic.png" alt="a">"#
        );
        assert_eq!(
            relocated.copies,
            vec![AssetCopy {
                path: "images/questiontext-7-mypic.png".to_string(),
                bytes: b"png".to_vec(),
            }]
        );
        assert_eq!(relocated.unresolved, 0);
    }

    #[test]
    fn same_name_in_two_fields_gets_two_paths() {
        let store = MemoryStore::default()
            .with(3, FieldKey::QuestionText, 7, "a.png", b"one")
            .with(3, FieldKey::AnswerFeedback, 70, "a.png", b"two");
        let mut question = question(
            r#"<img src="@@PLUGINFILE@@/a.png">"#,
            r#"<img src='@@PLUGINFILE@@/a.png'>"#,
        );
        let relocated = relocate_assets(&mut question, &store).unwrap();

        let paths: Vec<&str> = relocated.copies.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["images/questiontext-7-a.png", "images/answerfeedback-70-a.png"]
        );
        assert_eq!(question.kind.answers()[0].feedback, "<img src='images/answerfeedback-70-a.png'>");
    }

    #[test]
    fn repeated_reference_is_copied_once() {
        let store = MemoryStore::default().with(3, FieldKey::QuestionText, 7, "a.png", b"one");
        let mut question = question(
            r#"<img src="@@PLUGINFILE@@/a.png"><img src="@@PLUGINFILE@@/a.png">"#,
            "",
        );
        let relocated = relocate_assets(&mut question, &store).unwrap();
        assert_eq!(relocated.copies.len(), 1);
        assert!(!question.text.contains(PLUGINFILE_MARKER));
    }

    #[test]
    fn unterminated_marker_is_left_in_place() {
        let store = MemoryStore::default().with(3, FieldKey::QuestionText, 7, "a.png", b"one");
        let text = r#"<img src="@@PLUGINFILE@@/a.png"> see @@PLUGINFILE@@/b.png"#;
        let mut question = question(text, "");
        let relocated = relocate_assets(&mut question, &store).unwrap();
        assert_eq!(
            question.text,
            r#"<img src="images/questiontext-7-a.png"> see @@PLUGINFILE@@/b.png"#
        );
        assert_eq!(relocated.unresolved, 1);
    }

    #[test]
    fn markup_characters_in_names_are_replaced() {
        let name = "a\"b<c>&d#e?f%g'h.png";
        let store = MemoryStore::default().with(3, FieldKey::QuestionText, 7, name, b"png");
        let mut question = question(
            r#"<p><img src="@@PLUGINFILE@@/a%22b%3Cc%3E%26d%23e%3Ff%25g%27h.png" alt="m"></p>"#,
            "",
        );
        let relocated = relocate_assets(&mut question, &store).unwrap();

        let path = "images/questiontext-7-a_b_c__d_e_f_g_h.png";
        assert_eq!(relocated.copies[0].path, path);
        assert_eq!(
            crate::sanitize::sanitize_html(&question.text),
            format!(r#"<p><img src="{path}" alt="m"/></p>"#)
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut question = question(r#"<img src="@@PLUGINFILE@@/gone.png">"#, "");
        let error = relocate_assets(&mut question, &MemoryStore::default()).unwrap_err();
        assert!(matches!(
            error,
            ExportError::AssetResolution { ref filename, owner_id: 7, .. } if filename == "gone.png"
        ));
    }
}
