//! File naming and persistence of output documents.

use std::path::PathBuf;

use tracing::debug;

use feedscribe_shared::{FeedscribeError, OutputDocument, Result};

/// Keep only `[A-Za-z0-9_\- ]` from a title, then turn spaces into underscores.
///
/// Non-ASCII characters are dropped. The result may be empty.
pub fn sanitize_file_name(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Derive the output file name for the item at `index` (0-based feed position).
///
/// A title that sanitizes to nothing becomes `<untitled_prefix>-<index + 1>`.
pub fn file_name_for(title: &str, index: usize, extension: &str, untitled_prefix: &str) -> String {
    let stem = sanitize_file_name(title);
    if stem.is_empty() {
        format!("{untitled_prefix}-{}.{extension}", index + 1)
    } else {
        format!("{stem}.{extension}")
    }
}

/// Writes documents into a single output directory.
///
/// Names are not uniquified: a second write to the same name replaces the first.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the output directory and any missing parents.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| FeedscribeError::io(&self.dir, e))
    }

    /// Write `doc` to `<dir>/<file_name>` and return the target path.
    ///
    /// The content goes to a dot-prefixed temp file first and is then renamed
    /// over the target, so a failed write never leaves a truncated document.
    pub fn write(&self, file_name: &str, doc: &OutputDocument) -> Result<PathBuf> {
        self.ensure_dir()?;

        let target = self.dir.join(file_name);
        let temp = self.dir.join(format!(".{file_name}.tmp"));

        std::fs::write(&temp, doc).map_err(|e| FeedscribeError::io(&target, e))?;

        if let Err(e) = std::fs::rename(&temp, &target) {
            let _ = std::fs::remove_file(&temp);
            return Err(FeedscribeError::io(&target, e));
        }

        debug!(path = %target.display(), bytes = doc.as_str().len(), "wrote document");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> OutputDocument {
        OutputDocument(text.to_string())
    }

    #[test]
    fn sanitize_strips_punctuation_and_maps_spaces() {
        assert_eq!(sanitize_file_name("Hello, World! 2024"), "Hello_World_2024");
        assert_eq!(sanitize_file_name("a/b\\c:d*e?f"), "abcdef");
        assert_eq!(sanitize_file_name("keep_under-score"), "keep_under-score");
    }

    #[test]
    fn sanitize_drops_non_ascii() {
        assert_eq!(sanitize_file_name("Café déjà vu"), "Caf_dj_vu");
        assert_eq!(sanitize_file_name("日本語"), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for title in ["Hello, World! 2024", "  spaced  out ", "Ünïcödé-ish", "", "A?"] {
            let once = sanitize_file_name(title);
            assert_eq!(sanitize_file_name(&once), once, "title {title:?}");
            assert!(
                once.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            );
        }
    }

    #[test]
    fn file_name_for_titles() {
        assert_eq!(file_name_for("Hello, World! 2024", 0, "md", "untitled"), "Hello_World_2024.md");
        assert_eq!(file_name_for("A!", 5, "md", "untitled"), "A.md");
    }

    #[test]
    fn file_name_for_empty_title_uses_index() {
        assert_eq!(file_name_for("", 0, "md", "untitled"), "untitled-1.md");
        assert_eq!(file_name_for("!!!", 3, "txt", "post"), "post-4.txt");
    }

    #[test]
    fn write_creates_missing_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(tmp.path().join("nested/out"));

        let path = writer.write("post.md", &doc("hello")).unwrap();

        assert_eq!(path, tmp.path().join("nested/out/post.md"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn write_overwrites_same_name() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(tmp.path());

        writer.write("A.md", &doc("first")).unwrap();
        writer.write("A.md", &doc("second")).unwrap();

        assert_eq!(std::fs::read_to_string(tmp.path().join("A.md")).unwrap(), "second");
        let names: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["A.md"]);
    }

    #[test]
    fn write_failure_names_target_path() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory squatting on the target name makes the rename fail.
        std::fs::create_dir(tmp.path().join("taken.md")).unwrap();
        std::fs::write(tmp.path().join("taken.md/inner"), "x").unwrap();
        let writer = OutputWriter::new(tmp.path());

        let err = writer.write("taken.md", &doc("content")).unwrap_err();

        match err {
            FeedscribeError::Io { path, .. } => assert_eq!(path, tmp.path().join("taken.md")),
            other => panic!("expected Io error, got {other:?}"),
        }
        assert!(!tmp.path().join(".taken.md.tmp").exists());
    }

    #[test]
    fn ensure_dir_fails_under_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("file"), "x").unwrap();
        let writer = OutputWriter::new(tmp.path().join("file/out"));

        assert!(matches!(writer.ensure_dir(), Err(FeedscribeError::Io { .. })));
    }
}
