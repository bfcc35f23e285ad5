//! Action runner
//!
//! One runner per artifact. Actions are executed by a single worker task
//! fed through an unbounded channel, so the n-th queued action starts only
//! after the (n-1)-th has settled and order follows `enqueue` calls, not
//! parse order. A failing action is recorded as failed and the worker moves
//! on to the next job.

use crate::error::{ActionError, FileStoreError, RunnerError};
use crate::files::FileStore;
use crate::payload;
use crate::ports::ShellExecutor;
use forge_types::{
    ActionKind, ActionSnapshot, ActionStatus, Diagnostic, FileEntry, FilePath, ParsedAction,
};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Called after every successful file write
pub type FilesChangedHook = Arc<dyn Fn() + Send + Sync>;

/// Collaborators shared by every runner of a workbench
#[derive(Clone)]
pub struct RunnerContext {
    pub files: Arc<FileStore>,
    pub shell: Arc<dyn ShellExecutor>,
    /// Prefix every file action path is rooted under
    pub work_dir: FilePath,
    pub on_files_changed: Option<FilesChangedHook>,
}

impl RunnerContext {
    pub fn new(
        files: Arc<FileStore>,
        shell: Arc<dyn ShellExecutor>,
        work_dir: impl Into<FilePath>,
    ) -> Self {
        Self {
            files,
            shell,
            work_dir: work_dir.into(),
            on_files_changed: None,
        }
    }

    pub fn with_files_changed(mut self, hook: FilesChangedHook) -> Self {
        self.on_files_changed = Some(hook);
        self
    }
}

struct ActionRecord {
    action: ParsedAction,
    status: ActionStatus,
    executed: bool,
    cancel: CancellationToken,
}

impl ActionRecord {
    fn new(action: ParsedAction) -> Self {
        Self {
            action,
            status: ActionStatus::Pending,
            executed: false,
            cancel: CancellationToken::new(),
        }
    }
}

#[derive(Default)]
struct RunnerState {
    actions: IndexMap<String, ActionRecord>,
    diagnostics: Vec<Diagnostic>,
}

impl RunnerState {
    /// The only place statuses change. Terminal statuses are final.
    fn transition(&mut self, action_id: &str, status: ActionStatus) -> bool {
        match self.actions.get_mut(action_id) {
            Some(record) if !record.status.is_terminal() => {
                debug!("Action {}: {} -> {}", action_id, record.status, status);
                record.status = status;
                true
            }
            _ => false,
        }
    }
}

fn lock(state: &Mutex<RunnerState>) -> MutexGuard<'_, RunnerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Job {
    Execute {
        action_id: String,
        reply: oneshot::Sender<Result<(), ActionError>>,
    },
    Barrier(oneshot::Sender<()>),
}

/// Handle to the outcome of one queued execution
#[derive(Debug)]
pub struct ActionTicket {
    action_id: String,
    reply: oneshot::Receiver<Result<(), ActionError>>,
}

impl ActionTicket {
    pub fn action_id(&self) -> &str {
        &self.action_id
    }

    /// Wait for the action to settle and get its error, if any
    pub async fn wait(self) -> Result<(), ActionError> {
        self.reply.await.unwrap_or(Err(ActionError::QueueClosed))
    }
}

/// Per-artifact action registry and sequential execution queue.
///
/// Must be created inside a Tokio runtime: the worker task is spawned on
/// construction and stops when the runner is dropped.
pub struct ActionRunner {
    artifact_id: String,
    state: Arc<Mutex<RunnerState>>,
    jobs: mpsc::UnboundedSender<Job>,
}

impl ActionRunner {
    pub fn new(artifact_id: impl Into<String>, context: RunnerContext) -> Self {
        let artifact_id = artifact_id.into();
        let state = Arc::new(Mutex::new(RunnerState::default()));
        let (jobs, queue) = mpsc::unbounded_channel();

        let worker = Worker {
            artifact_id: artifact_id.clone(),
            state: state.clone(),
            context,
        };
        tokio::spawn(worker.run(queue));

        Self {
            artifact_id,
            state,
            jobs,
        }
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// Record a newly seen action as pending. A known id is left untouched.
    pub fn register(&self, action_id: impl Into<String>, action: ParsedAction) -> bool {
        let action_id = action_id.into();
        let mut state = lock(&self.state);
        if state.actions.contains_key(&action_id) {
            return false;
        }
        debug!("Registered action {} ({}) in artifact {}", action_id, action.kind(), self.artifact_id);
        state.actions.insert(action_id, ActionRecord::new(action));
        true
    }

    /// Store the final payload and queue the action for execution.
    ///
    /// Unknown ids are registered first. Returns `Ok(None)` when the action
    /// was already queued; it executes at most once.
    pub fn enqueue(
        &self,
        action_id: impl Into<String>,
        action: ParsedAction,
    ) -> Result<Option<ActionTicket>, RunnerError> {
        let action_id = action_id.into();
        {
            let mut state = lock(&self.state);
            let record = state
                .actions
                .entry(action_id.clone())
                .or_insert_with(|| ActionRecord::new(action.clone()));
            if record.executed {
                debug!("Action {} already queued, ignoring", action_id);
                return Ok(None);
            }
            record.action = action;
            record.executed = true;
        }

        let (reply, receiver) = oneshot::channel();
        self.jobs
            .send(Job::Execute {
                action_id: action_id.clone(),
                reply,
            })
            .map_err(|_| RunnerError::QueueClosed(self.artifact_id.clone()))?;

        debug!("Queued action {} in artifact {}", action_id, self.artifact_id);
        Ok(Some(ActionTicket {
            action_id,
            reply: receiver,
        }))
    }

    /// Replace the displayed payload of an action that is still streaming.
    ///
    /// Ignored once the action has been queued.
    pub fn update_content(
        &self,
        action_id: &str,
        content: impl Into<String>,
    ) -> Result<(), RunnerError> {
        let mut state = lock(&self.state);
        let record = state
            .actions
            .get_mut(action_id)
            .ok_or_else(|| self.unknown(action_id))?;
        if !record.executed {
            record.action.set_content(content);
        }
        Ok(())
    }

    /// Cancel an action. Pending actions never start; a running one is
    /// signalled and must stop on its own.
    pub fn abort(&self, action_id: &str) -> Result<(), RunnerError> {
        let mut state = lock(&self.state);
        let record = state
            .actions
            .get(action_id)
            .ok_or_else(|| self.unknown(action_id))?;
        record.cancel.cancel();
        if state.transition(action_id, ActionStatus::Aborted) {
            info!("Aborted action {} in artifact {}", action_id, self.artifact_id);
        }
        Ok(())
    }

    /// Abort every action that has not settled yet. Returns how many.
    pub fn abort_all(&self) -> usize {
        let mut state = lock(&self.state);
        let open: Vec<String> = state
            .actions
            .iter()
            .filter(|(_, record)| !record.status.is_terminal())
            .map(|(id, _)| id.clone())
            .collect();
        for action_id in &open {
            if let Some(record) = state.actions.get(action_id) {
                record.cancel.cancel();
            }
            state.transition(action_id, ActionStatus::Aborted);
        }
        open.len()
    }

    /// Wait until every execution queued so far has settled
    pub async fn settled(&self) {
        let (done, wait) = oneshot::channel();
        if self.jobs.send(Job::Barrier(done)).is_ok() {
            let _ = wait.await;
        }
    }

    pub fn status(&self, action_id: &str) -> Option<ActionStatus> {
        lock(&self.state)
            .actions
            .get(action_id)
            .map(|record| record.status.clone())
    }

    pub fn action(&self, action_id: &str) -> Option<ActionSnapshot> {
        lock(&self.state)
            .actions
            .get(action_id)
            .map(|record| snapshot(action_id, record))
    }

    /// Every action in registration order
    pub fn snapshot(&self) -> Vec<ActionSnapshot> {
        lock(&self.state)
            .actions
            .iter()
            .map(|(id, record)| snapshot(id, record))
            .collect()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        lock(&self.state).diagnostics.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unknown(&self, action_id: &str) -> RunnerError {
        RunnerError::UnknownAction {
            artifact_id: self.artifact_id.clone(),
            action_id: action_id.to_string(),
        }
    }
}

fn snapshot(action_id: &str, record: &ActionRecord) -> ActionSnapshot {
    ActionSnapshot {
        id: action_id.to_string(),
        action: record.action.clone(),
        status: record.status.clone(),
        executed: record.executed,
    }
}

struct Worker {
    artifact_id: String,
    state: Arc<Mutex<RunnerState>>,
    context: RunnerContext,
}

impl Worker {
    async fn run(self, mut queue: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = queue.recv().await {
            match job {
                Job::Execute { action_id, reply } => {
                    let outcome = self.execute(&action_id).await;
                    let _ = reply.send(outcome);
                }
                Job::Barrier(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!("Runner for artifact {} stopped", self.artifact_id);
    }

    async fn execute(&self, action_id: &str) -> Result<(), ActionError> {
        let (action, cancel) = {
            let mut state = lock(&self.state);
            let Some(record) = state.actions.get(action_id) else {
                return Err(ActionError::Aborted);
            };
            if record.status.is_terminal() || record.cancel.is_cancelled() {
                debug!("Skipping action {}: {}", action_id, record.status);
                return Err(ActionError::Aborted);
            }
            let started = (record.action.clone(), record.cancel.clone());
            state.transition(action_id, ActionStatus::Running);
            started
        };

        let result = match &action {
            ParsedAction::Shell { content } => self
                .context
                .shell
                .execute(content, cancel.clone())
                .await
                .map_err(ActionError::from),
            ParsedAction::File { file_path, content } => self.write_file(file_path, content),
        };

        let status = if cancel.is_cancelled() {
            ActionStatus::Aborted
        } else {
            match &result {
                Ok(()) => ActionStatus::Complete,
                Err(e) => {
                    error!(
                        "Action {} in artifact {} failed: {}",
                        action_id, self.artifact_id, e
                    );
                    ActionStatus::Failed {
                        error: e.to_string(),
                    }
                }
            }
        };
        lock(&self.state).transition(action_id, status);

        if cancel.is_cancelled() {
            return Err(ActionError::Aborted);
        }
        result
    }

    fn write_file(&self, file_path: &str, content: &str) -> Result<(), ActionError> {
        if file_path.trim().is_empty() {
            return Err(ActionError::FilePathRequired);
        }
        let content = payload::clean(content, ActionKind::File);
        if content.is_empty() {
            return Err(ActionError::EmptyContent {
                path: file_path.to_string(),
            });
        }

        let path = self.resolve(file_path);
        let files = &self.context.files;

        for ancestor in path.ancestors() {
            match files.entry(&ancestor) {
                Some(FileEntry::Folder) => {}
                Some(FileEntry::File(_)) => {
                    return Err(FileStoreError::NotAFolder {
                        path,
                        blocker: ancestor,
                    }
                    .into())
                }
                None => files.add_folder(ancestor),
            }
        }
        if let Some(FileEntry::Folder) = files.entry(&path) {
            return Err(FileStoreError::NotAFile(path).into());
        }

        if let Some(duplicate_of) = files
            .paths_with_content(&content)
            .into_iter()
            .find(|other| *other != path)
        {
            let diagnostic = Diagnostic::DuplicateContent {
                path: path.clone(),
                duplicate_of,
            };
            warn!("{}", diagnostic);
            let mut state = lock(&self.state);
            if !state.diagnostics.iter().any(|d| d.same_finding(&diagnostic)) {
                state.diagnostics.push(diagnostic);
            }
        }

        files.add_file(path.clone(), content, false);
        info!("Wrote {}", path);

        if let Some(hook) = &self.context.on_files_changed {
            hook();
        }
        Ok(())
    }

    /// Root a model-supplied path under the working directory
    fn resolve(&self, file_path: &str) -> FilePath {
        let path = FilePath::new(file_path);
        if path.starts_with(&self.context.work_dir) {
            path
        } else {
            self.context.work_dir.join(path.as_str())
        }
    }
}
