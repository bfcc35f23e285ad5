//! Workbench coordinator
//!
//! Owns the file store, one [`ActionRunner`] per artifact and the editor
//! state. Parser events are routed here by artifact id.

pub mod editor;

pub use editor::{EditorDocument, EditorState};

use crate::diff;
use crate::error::WorkbenchError;
use crate::files::FileStore;
use crate::ports::{ShellExecutor, SimulatedShell};
use crate::runner::{ActionRunner, RunnerContext};
use crate::types::ForgeConfig;
use forge_types::{
    ArtifactMeta, ArtifactSnapshot, Diagnostic, FileModification, FilePath, FileSnapshot,
    ParseError, ParseEvent,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// An artifact and the runner executing its actions
pub struct ArtifactRecord {
    id: String,
    title: String,
    closed: bool,
    runner: ActionRunner,
}

impl ArtifactRecord {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn closed(&self) -> bool {
        self.closed
    }

    pub fn runner(&self) -> &ActionRunner {
        &self.runner
    }

    pub fn snapshot(&self) -> ArtifactSnapshot {
        ArtifactSnapshot {
            id: self.id.clone(),
            title: self.title.clone(),
            closed: self.closed,
            actions: self.runner.snapshot(),
        }
    }
}

/// Read-only view of the whole workbench, for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkbenchSnapshot {
    pub artifacts: Vec<ArtifactSnapshot>,
    pub files: Vec<FileSnapshot>,
    pub selected_file: Option<FilePath>,
    pub unsaved_files: Vec<FilePath>,
    pub diagnostics: Vec<Diagnostic>,
    pub parse_errors: Vec<ParseError>,
}

pub struct Workbench {
    config: ForgeConfig,
    files: Arc<FileStore>,
    context: RunnerContext,
    artifacts: IndexMap<String, ArtifactRecord>,
    editor: Arc<Mutex<EditorState>>,
    parse_errors: Vec<ParseError>,
}

fn lock(editor: &Mutex<EditorState>) -> MutexGuard<'_, EditorState> {
    editor.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Workbench {
    /// Workbench with the simulated shell executor
    pub fn new(config: ForgeConfig) -> Self {
        let shell = Arc::new(SimulatedShell::new(config.shell_delay()));
        Self::with_executor(config, shell)
    }

    pub fn with_executor(config: ForgeConfig, shell: Arc<dyn ShellExecutor>) -> Self {
        let files = Arc::new(FileStore::new());
        let work_dir = FilePath::new(&config.work_dir);

        if config.seed_work_dir && !work_dir.is_root() {
            for folder in work_dir.ancestors() {
                files.add_folder(folder);
            }
            files.add_folder(work_dir.clone());
        }

        let editor = Arc::new(Mutex::new(EditorState::default()));
        let hook = {
            let editor = editor.clone();
            let files = files.clone();
            Arc::new(move || lock(&editor).sync(&files))
        };
        let context =
            RunnerContext::new(files.clone(), shell, work_dir).with_files_changed(hook);

        Self {
            config,
            files,
            context,
            artifacts: IndexMap::new(),
            editor,
            parse_errors: Vec::new(),
        }
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn files(&self) -> &Arc<FileStore> {
        &self.files
    }

    /// Route one parser event.
    ///
    /// Events naming an artifact that was never opened are contract
    /// violations and return an error.
    pub fn handle_event(&mut self, event: ParseEvent) -> Result<(), WorkbenchError> {
        match event {
            ParseEvent::Text { .. } => Ok(()),
            ParseEvent::ArtifactOpen { artifact } => {
                self.open_artifact(artifact);
                Ok(())
            }
            ParseEvent::ArtifactClose { artifact_id } => {
                let record = self.record_mut(&artifact_id)?;
                record.closed = true;
                debug!("Artifact {} closed", artifact_id);
                Ok(())
            }
            ParseEvent::ActionOpen {
                artifact_id,
                action_id,
                action,
            } => {
                self.record(&artifact_id)?.runner.register(action_id, action);
                Ok(())
            }
            ParseEvent::ActionUpdate {
                artifact_id,
                action_id,
                content,
            } => {
                self.record(&artifact_id)?
                    .runner
                    .update_content(&action_id, content)?;
                Ok(())
            }
            ParseEvent::ActionClose {
                artifact_id,
                action_id,
                action,
            } => {
                // outcomes land in the action status
                self.record(&artifact_id)?.runner.enqueue(action_id, action)?;
                Ok(())
            }
            ParseEvent::Error { error } => {
                warn!("Parse error: {}", error);
                self.parse_errors.push(error);
                Ok(())
            }
        }
    }

    fn open_artifact(&mut self, artifact: ArtifactMeta) {
        if let Some(existing) = self.artifacts.get(&artifact.id) {
            if !existing.closed {
                debug!("Artifact {} already open", artifact.id);
                return;
            }
            // a closed artifact id reopened by a later response
            self.artifacts.shift_remove(&artifact.id);
        }

        info!("Opened artifact {} ({})", artifact.id, artifact.title);
        let runner = ActionRunner::new(artifact.id.clone(), self.context.clone());
        self.artifacts.insert(
            artifact.id.clone(),
            ArtifactRecord {
                id: artifact.id,
                title: artifact.title,
                closed: false,
                runner,
            },
        );
    }

    fn record(&self, artifact_id: &str) -> Result<&ArtifactRecord, WorkbenchError> {
        self.artifacts
            .get(artifact_id)
            .ok_or_else(|| WorkbenchError::UnknownArtifact(artifact_id.to_string()))
    }

    fn record_mut(&mut self, artifact_id: &str) -> Result<&mut ArtifactRecord, WorkbenchError> {
        self.artifacts
            .get_mut(artifact_id)
            .ok_or_else(|| WorkbenchError::UnknownArtifact(artifact_id.to_string()))
    }

    pub fn artifact(&self, artifact_id: &str) -> Option<&ArtifactRecord> {
        self.artifacts.get(artifact_id)
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.artifacts.values()
    }

    pub fn first_artifact(&self) -> Option<&ArtifactRecord> {
        self.artifacts.values().next()
    }

    pub fn abort_action(&self, artifact_id: &str, action_id: &str) -> Result<(), WorkbenchError> {
        self.record(artifact_id)?.runner.abort(action_id)?;
        Ok(())
    }

    /// Abort every unsettled action of every artifact
    pub fn abort_all_actions(&self) -> usize {
        let aborted: usize = self
            .artifacts
            .values()
            .map(|record| record.runner.abort_all())
            .sum();
        if aborted > 0 {
            info!("Aborted {} actions", aborted);
        }
        aborted
    }

    /// Wait until every queued action of every artifact has settled
    pub async fn settled(&self) {
        for record in self.artifacts.values() {
            record.runner.settled().await;
        }
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.artifacts
            .values()
            .flat_map(|record| record.runner.diagnostics())
            .collect()
    }

    pub fn parse_errors(&self) -> &[ParseError] {
        &self.parse_errors
    }

    /// Select a file for editing.
    ///
    /// A path missing from the tree is retried under the working directory.
    pub fn select_file(&self, path: &str) -> bool {
        let mut editor = lock(&self.editor);
        editor.sync(&self.files);

        let path = FilePath::new(path);
        if editor.has_document(&path) {
            return editor.select(path);
        }
        let rooted = self.context.work_dir.join(path.as_str());
        editor.select(rooted)
    }

    pub fn selected_file(&self) -> Option<EditorDocument> {
        lock(&self.editor).selected().cloned()
    }

    pub fn document(&self, path: &str) -> Option<EditorDocument> {
        lock(&self.editor).document(&FilePath::new(path)).cloned()
    }

    /// Replace the selected document's text. Returns false with no selection.
    pub fn set_document_content(&self, value: impl Into<String>) -> bool {
        lock(&self.editor).set_content(&self.files, value)
    }

    pub fn save_file(&self, path: &str) -> Result<(), WorkbenchError> {
        lock(&self.editor).save(&self.files, &FilePath::new(path))?;
        Ok(())
    }

    pub fn save_current_document(&self) -> Result<(), WorkbenchError> {
        let mut editor = lock(&self.editor);
        match editor.selected_path().cloned() {
            Some(path) => Ok(editor.save(&self.files, &path)?),
            None => Ok(()),
        }
    }

    pub fn save_all_files(&self) -> Result<usize, WorkbenchError> {
        Ok(lock(&self.editor).save_all(&self.files)?)
    }

    pub fn reset_current_document(&self) -> bool {
        lock(&self.editor).reset_selected(&self.files)
    }

    pub fn unsaved_files(&self) -> Vec<FilePath> {
        lock(&self.editor).unsaved()
    }

    pub fn file_modifications(&self) -> BTreeMap<FilePath, FileModification> {
        self.files.get_file_modifications()
    }

    /// Modifications rendered for the next model turn
    pub fn modifications_block(&self) -> Option<String> {
        diff::render_modifications(&self.file_modifications())
    }

    /// Checkpoint: the next user turn starts from the current content
    pub fn reset_file_modifications(&self) {
        self.files.reset_file_modifications();
    }

    pub fn snapshot(&self) -> WorkbenchSnapshot {
        let editor = lock(&self.editor);
        WorkbenchSnapshot {
            artifacts: self.artifacts.values().map(ArtifactRecord::snapshot).collect(),
            files: self.files.entries(),
            selected_file: editor.selected_path().cloned(),
            unsaved_files: editor.unsaved(),
            diagnostics: self.diagnostics(),
            parse_errors: self.parse_errors.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::StreamingParser;
    use forge_types::{ActionStatus, FileEntry, ParsedAction};
    use std::time::Duration;

    fn workbench() -> Workbench {
        Workbench::new(ForgeConfig::default().with_shell_delay(Duration::from_millis(5)))
    }

    fn open(id: &str) -> ParseEvent {
        ParseEvent::ArtifactOpen {
            artifact: ArtifactMeta {
                id: id.to_string(),
                title: format!("{} title", id),
            },
        }
    }

    fn close_file(artifact: &str, action: &str, path: &str, content: &str) -> ParseEvent {
        ParseEvent::ActionClose {
            artifact_id: artifact.to_string(),
            action_id: action.to_string(),
            action: ParsedAction::file(path, content),
        }
    }

    #[tokio::test]
    async fn test_seeds_work_dir() {
        let workbench = workbench();
        assert_eq!(workbench.files().entry("home"), Some(FileEntry::Folder));
        assert_eq!(workbench.files().entry("home/project"), Some(FileEntry::Folder));
        assert_eq!(workbench.files().files_count(), 0);
    }

    #[tokio::test]
    async fn test_routes_actions_by_artifact() {
        let mut workbench = workbench();
        workbench.handle_event(open("one")).unwrap();
        workbench.handle_event(open("two")).unwrap();
        workbench
            .handle_event(close_file("two", "0", "b.txt", "b"))
            .unwrap();
        workbench
            .handle_event(close_file("one", "0", "a.txt", "a"))
            .unwrap();
        workbench.settled().await;

        let one = workbench.artifact("one").unwrap();
        let two = workbench.artifact("two").unwrap();
        assert_eq!(one.runner().len(), 1);
        assert_eq!(two.runner().len(), 1);
        assert_eq!(one.runner().status("0"), Some(ActionStatus::Complete));
        assert_eq!(workbench.first_artifact().unwrap().id(), "one");
        assert_eq!(workbench.files().files_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_artifact_is_an_error() {
        let mut workbench = workbench();
        let result = workbench.handle_event(close_file("ghost", "0", "a.txt", "a"));
        assert_eq!(
            result,
            Err(WorkbenchError::UnknownArtifact("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn test_duplicate_open_keeps_runner_and_reopen_after_close_resets() {
        let mut workbench = workbench();
        workbench.handle_event(open("app")).unwrap();
        workbench
            .handle_event(close_file("app", "0", "a.txt", "a"))
            .unwrap();
        workbench.handle_event(open("app")).unwrap();
        assert_eq!(workbench.artifact("app").unwrap().runner().len(), 1);

        workbench
            .handle_event(ParseEvent::ArtifactClose {
                artifact_id: "app".to_string(),
            })
            .unwrap();
        assert!(workbench.artifact("app").unwrap().closed());

        workbench.handle_event(open("app")).unwrap();
        let reopened = workbench.artifact("app").unwrap();
        assert!(!reopened.closed());
        assert!(reopened.runner().is_empty());
    }

    #[tokio::test]
    async fn test_first_written_file_is_selected() {
        let mut workbench = workbench();
        workbench.handle_event(open("app")).unwrap();
        workbench
            .handle_event(close_file("app", "0", "src/main.ts", "main"))
            .unwrap();
        workbench
            .handle_event(close_file("app", "1", "README.md", "readme"))
            .unwrap();
        workbench.settled().await;

        let selected = workbench.selected_file().unwrap();
        assert_eq!(selected.path, FilePath::new("home/project/src/main.ts"));

        assert!(workbench.select_file("/README.md"));
        assert_eq!(
            workbench.selected_file().unwrap().path,
            FilePath::new("home/project/README.md")
        );
        assert!(!workbench.select_file("missing.txt"));
    }

    #[tokio::test]
    async fn test_editing_and_saving_tracks_modifications() {
        let mut workbench = workbench();
        workbench.handle_event(open("app")).unwrap();
        workbench
            .handle_event(close_file("app", "0", "index.js", "console.log(1);"))
            .unwrap();
        workbench.settled().await;

        assert!(workbench.set_document_content("console.log(2);\n"));
        assert_eq!(
            workbench.unsaved_files(),
            vec![FilePath::new("home/project/index.js")]
        );
        assert!(workbench.file_modifications().is_empty());

        assert_eq!(workbench.save_all_files().unwrap(), 1);
        assert!(workbench.unsaved_files().is_empty());

        let mods = workbench.file_modifications();
        let modification = &mods[&FilePath::new("home/project/index.js")];
        assert_eq!(modification.original, "console.log(1);\n");
        assert_eq!(modification.current, "console.log(2);\n");
        assert!(workbench
            .modifications_block()
            .unwrap()
            .contains("path=\"/home/project/index.js\""));

        workbench.reset_file_modifications();
        assert!(workbench.modifications_block().is_none());
    }

    #[tokio::test]
    async fn test_save_file_rejects_unknown_path() {
        let workbench = workbench();
        assert!(matches!(
            workbench.save_file("nope.txt"),
            Err(WorkbenchError::Files(_))
        ));
        assert!(workbench.save_current_document().is_ok());
    }

    #[tokio::test]
    async fn test_reset_current_document() {
        let mut workbench = workbench();
        workbench.handle_event(open("app")).unwrap();
        workbench
            .handle_event(close_file("app", "0", "a.txt", "a"))
            .unwrap();
        workbench.settled().await;

        workbench.set_document_content("scratch");
        assert!(workbench.reset_current_document());
        assert_eq!(workbench.selected_file().unwrap().value, "a\n");
        assert!(workbench.unsaved_files().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_all_actions() {
        let mut workbench = Workbench::new(ForgeConfig::default());
        let mut parser = StreamingParser::new();
        let events: Vec<_> = parser
            .feed(concat!(
                "<boltArtifact id=\"app\" title=\"App\">",
                "<boltAction type=\"shell\">npm install</boltAction>",
                "<boltAction type=\"shell\">npm run dev</boltAction>",
                "</boltArtifact>"
            ))
            .collect();
        for event in events {
            workbench.handle_event(event).unwrap();
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(workbench.abort_all_actions(), 2);
        workbench.settled().await;

        let runner = workbench.artifact("app").unwrap().runner();
        assert_eq!(runner.status("0"), Some(ActionStatus::Aborted));
        assert_eq!(runner.status("1"), Some(ActionStatus::Aborted));
    }

    #[tokio::test]
    async fn test_parse_errors_are_collected() {
        let mut workbench = workbench();
        workbench
            .handle_event(ParseEvent::Error {
                error: ParseError::MissingAttribute {
                    element: "boltArtifact".to_string(),
                    attribute: "id".to_string(),
                },
            })
            .unwrap();

        let snapshot = workbench.snapshot();
        assert_eq!(snapshot.parse_errors.len(), 1);
        assert!(snapshot.artifacts.is_empty());
        assert_eq!(snapshot.selected_file, None);
    }
}
