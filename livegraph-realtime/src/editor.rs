//! Editor boundary.
//!
//! An editor reports its full text on every change. [`SourceEditor`] is the
//! in-process handle; [`FileEditor`] treats a file on disk as the editor and
//! reports its contents whenever it is written. Dropping a `FileEditor`
//! removes the watch.

use anyhow::{Context, Result};
use livegraph_utils::logging::{get_logger, Logger};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("the pipeline is no longer listening for edits")]
pub struct EditorClosed;

/// Sending half of an editor's change stream
#[derive(Debug, Clone)]
pub struct SourceEditor {
    changes: mpsc::UnboundedSender<String>,
}

impl SourceEditor {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (changes, rx) = mpsc::unbounded_channel();
        (Self { changes }, rx)
    }

    /// Report the editor's full text after an edit
    pub fn change(&self, text: impl Into<String>) -> Result<(), EditorClosed> {
        self.changes.send(text.into()).map_err(|_| EditorClosed)
    }

    pub fn is_attached(&self) -> bool {
        !self.changes.is_closed()
    }
}

/// A file on disk acting as the editor
pub struct FileEditor {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl FileEditor {
    /// Start watching `path`, reporting its full text through `editor` on
    /// every write. Returns the editor together with the current contents.
    pub fn attach(path: impl AsRef<Path>, editor: SourceEditor) -> Result<(Self, String)> {
        let path = path.as_ref().to_path_buf();
        let initial = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        // Watch the directory: editors often replace the file instead of writing it.
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let file_name = path.file_name().map(|n| n.to_os_string());
        let target = path.clone();
        let logger = get_logger("livegraph.editor");

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let relevant = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
                    && event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if relevant {
                    report(&target, &editor, &logger);
                }
            }
            Err(e) => logger.exception("File watcher error", &e),
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to start watching {}", dir.display()))?;

        get_logger("livegraph.editor").info(&format!("Editing {}", path.display()));
        Ok((
            Self {
                path,
                _watcher: watcher,
            },
            initial,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn report(path: &Path, editor: &SourceEditor, logger: &Logger) {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            logger.trace(&format!("{} changed ({} bytes)", path.display(), text.len()));
            if editor.change(text).is_err() {
                logger.debug("Edit dropped: pipeline stopped");
            }
        }
        // The file can be briefly missing while an editor swaps it in.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            logger.debug(&format!("{} is missing, waiting for it to reappear", path.display()))
        }
        Err(e) => logger.exception(&format!("Could not read {}", path.display()), &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_after_receiver_dropped() {
        let (editor, rx) = SourceEditor::channel();
        assert!(editor.is_attached());
        editor.change("a").unwrap();
        drop(rx);
        assert!(!editor.is_attached());
        assert_eq!(editor.change("b"), Err(EditorClosed));
    }

    #[test]
    fn test_attach_reads_initial_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view-model.js");
        std::fs::write(&path, "const a = 1;").unwrap();

        let (editor, _rx) = SourceEditor::channel();
        let (file_editor, initial) = FileEditor::attach(&path, editor).unwrap();
        assert_eq!(initial, "const a = 1;");
        assert_eq!(file_editor.path(), path.as_path());
    }

    #[test]
    fn test_attach_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (editor, _rx) = SourceEditor::channel();
        assert!(FileEditor::attach(dir.path().join("missing.js"), editor).is_err());
    }

    #[test]
    fn test_report_forwards_readable_text_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view-model.js");
        std::fs::write(&path, "const b = 2;").unwrap();
        let logger = get_logger("livegraph.editor.test");
        let (editor, mut rx) = SourceEditor::channel();

        report(&path, &editor, &logger);
        assert_eq!(rx.try_recv().unwrap(), "const b = 2;");

        report(&dir.path().join("swapped-out.js"), &editor, &logger);
        report(dir.path(), &editor, &logger);
        assert!(rx.try_recv().is_err());
    }
}
