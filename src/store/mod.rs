//! The record store: single source of truth for every entity.
//!
//! All collections live in memory and the whole document is flushed to
//! [`Storage`] after each mutation. Task mutations re-derive the owning
//! project's `progress` before the flush, so it is never observed stale.

mod document;

pub use document::{Document, DOCUMENT_KEY, HISTORY_KEY};

use chrono::Utc;
use log::{debug, info, warn};
use thiserror::Error;

use crate::io::{Storage, StorageError};
use crate::model::history::SYSTEM_ACTOR;
use crate::model::project::completion_percent;
use crate::model::{
    Comment, CommentId, CommentPatch, FileId, FilePatch, HistoryEntry, HistoryLog, NewComment,
    NewFile, NewProject, NewTask, Project, ProjectFile, ProjectId, ProjectPatch, Task, TaskId,
    TaskPatch, DEFAULT_HISTORY_LIMIT,
};
use document::{load_or_default, DocumentView};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The change is applied in memory but could not be written out.
    /// The next successful flush persists it.
    #[error("change kept in memory but not persisted: {0}")]
    Persist(#[from] StorageError),
    #[error("could not serialize the document: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("project {0} does not exist")]
    UnknownProject(ProjectId),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Actor recorded on history entries for user-initiated changes.
    pub actor: String,
    pub history_limit: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            actor: "User".to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

pub struct RecordStore<S: Storage> {
    storage: S,
    actor: String,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    comments: Vec<Comment>,
    files: Vec<ProjectFile>,
    history: HistoryLog,
}

impl<S: Storage> RecordStore<S> {
    /// Hydrate the store from `storage`.
    ///
    /// Never fails: an unreadable or corrupt document yields an empty store.
    /// The history log is read from its own key, or seeded from the
    /// document's embedded copy when that key is absent.
    pub fn open(storage: S, options: StoreOptions) -> Self {
        let doc: Document = load_or_default(&storage, DOCUMENT_KEY).unwrap_or_default();
        let history_entries: Vec<HistoryEntry> =
            load_or_default(&storage, HISTORY_KEY).unwrap_or(doc.history);

        info!(
            "store opened: {} projects, {} tasks, {} comments, {} files, {} history entries",
            doc.projects.len(),
            doc.tasks.len(),
            doc.comments.len(),
            doc.files.len(),
            history_entries.len()
        );

        Self {
            storage,
            actor: options.actor,
            projects: doc.projects,
            tasks: doc.tasks,
            comments: doc.comments,
            files: doc.files,
            history: HistoryLog::from_entries(history_entries, options.history_limit),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn set_actor(&mut self, actor: impl Into<String>) {
        self.actor = actor.into();
    }

    /// Write the document and the history log to storage.
    pub fn flush(&mut self) -> StoreResult<()> {
        let view = DocumentView {
            projects: &self.projects,
            tasks: &self.tasks,
            comments: &self.comments,
            files: &self.files,
            history: &self.history,
        };
        let doc_json = serde_json::to_string(&view)?;
        let history_json = serde_json::to_string(&self.history)?;

        let result = self
            .storage
            .write(DOCUMENT_KEY, &doc_json)
            .and_then(|()| self.storage.write(HISTORY_KEY, &history_json));
        if let Err(err) = &result {
            warn!("persisting store failed: {err}");
        }
        Ok(result?)
    }

    /// Owned copy of the full state, history included.
    pub fn snapshot(&self) -> Document {
        Document {
            projects: self.projects.clone(),
            tasks: self.tasks.clone(),
            comments: self.comments.clone(),
            files: self.files.clone(),
            history: self.history.to_vec(),
        }
    }

    fn ensure_project(&self, project_id: ProjectId) -> StoreResult<()> {
        if self.projects.iter().any(|p| p.id == project_id) {
            Ok(())
        } else {
            Err(StoreError::UnknownProject(project_id))
        }
    }

    fn log_action(&mut self, project_id: ProjectId, action: String) {
        debug!("project {project_id}: {action}");
        self.history.append(project_id, self.actor.clone(), action);
    }

    // --- Projects ---

    pub fn create_project(&mut self, new: NewProject) -> StoreResult<Project> {
        let project = Project::from_new(new, Utc::now());
        self.projects.push(project.clone());
        self.log_action(project.id, format!("Project created: {}", project.name));
        self.flush()?;
        Ok(project)
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Every project, soft-deleted ones included.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn active_projects(&self) -> Vec<&Project> {
        self.projects.iter().filter(|p| p.is_active()).collect()
    }

    pub fn deleted_projects(&self) -> Vec<&Project> {
        self.projects.iter().filter(|p| p.is_deleted).collect()
    }

    /// Returns `Ok(None)` when the project does not exist.
    pub fn update_project(
        &mut self,
        id: ProjectId,
        patch: ProjectPatch,
    ) -> StoreResult<Option<Project>> {
        let Some(project) = self.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        let was_finished = project.is_finished;
        project.apply(patch);
        let updated = project.clone();

        self.log_action(id, format!("Project updated: {}", updated.name));
        if updated.is_finished && !was_finished {
            self.log_action(id, "Project marked as finished".to_string());
        }
        self.flush()?;
        Ok(Some(updated))
    }

    /// Soft delete: the project stays in the collection with `is_deleted` set.
    pub fn delete_project(&mut self, id: ProjectId) -> StoreResult<bool> {
        let Some(project) = self.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        project.is_deleted = true;
        project.touch();
        let name = project.name.clone();

        self.log_action(id, format!("Project deleted: {name}"));
        self.flush()?;
        Ok(true)
    }

    // --- Tasks ---

    pub fn create_task(&mut self, new: NewTask) -> StoreResult<Task> {
        self.ensure_project(new.project_id)?;
        let task = Task::from_new(new, Utc::now());
        self.tasks.push(task.clone());

        self.log_action(task.project_id, format!("Task created: {}", task.name));
        self.recompute_progress(task.project_id);
        self.flush()?;
        Ok(task)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn tasks_for_project(&self, project_id: ProjectId) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .collect()
    }

    /// Returns `Ok(None)` when the task does not exist. Moving a task to
    /// another project re-derives progress on both.
    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(target) = patch.project_id {
            self.ensure_project(target)?;
        }
        let task = &mut self.tasks[index];
        let previous_project = task.project_id;
        let previous_status = task.status;
        task.apply(patch);
        let updated = task.clone();

        let action = if updated.status != previous_status {
            format!("Task '{}' moved to {}", updated.name, updated.status)
        } else {
            format!("Task updated: {}", updated.name)
        };
        self.log_action(updated.project_id, action);
        if previous_project != updated.project_id {
            self.recompute_progress(previous_project);
        }
        self.recompute_progress(updated.project_id);
        self.flush()?;
        Ok(Some(updated))
    }

    pub fn delete_task(&mut self, id: TaskId) -> StoreResult<bool> {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        let task = self.tasks.remove(index);

        self.log_action(task.project_id, format!("Task deleted: {}", task.name));
        self.recompute_progress(task.project_id);
        self.flush()?;
        Ok(true)
    }

    /// Re-derive `progress` and `is_finished` for one project from its tasks.
    fn recompute_progress(&mut self, project_id: ProjectId) {
        let (completed, total) = self
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .fold((0usize, 0usize), |(done, total), t| {
                (done + usize::from(t.is_done()), total + 1)
            });

        let Some(project) = self.projects.iter_mut().find(|p| p.id == project_id) else {
            return;
        };
        let progress = completion_percent(completed, total);
        project.set_progress(progress);

        self.history.append(
            project_id,
            SYSTEM_ACTOR,
            format!("Progress updated to {progress}% ({completed}/{total} tasks completed)"),
        );
    }

    // --- Comments ---

    pub fn create_comment(&mut self, new: NewComment) -> StoreResult<Comment> {
        self.ensure_project(new.project_id)?;
        let comment = Comment::from_new(new, Utc::now());
        self.comments.push(comment.clone());

        let author = if comment.author.is_empty() {
            self.actor.clone()
        } else {
            comment.author.clone()
        };
        self.log_action(comment.project_id, format!("Comment added by {author}"));
        self.flush()?;
        Ok(comment)
    }

    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn comments_for_project(&self, project_id: ProjectId) -> Vec<&Comment> {
        self.comments
            .iter()
            .filter(|c| c.project_id == project_id)
            .collect()
    }

    pub fn update_comment(
        &mut self,
        id: CommentId,
        patch: CommentPatch,
    ) -> StoreResult<Option<Comment>> {
        let Some(comment) = self.comments.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        comment.apply(patch);
        let updated = comment.clone();
        self.flush()?;
        Ok(Some(updated))
    }

    pub fn delete_comment(&mut self, id: CommentId) -> StoreResult<bool> {
        let before = self.comments.len();
        self.comments.retain(|c| c.id != id);
        if self.comments.len() == before {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    // --- Files ---

    pub fn create_file(&mut self, new: NewFile) -> StoreResult<ProjectFile> {
        self.ensure_project(new.project_id)?;
        let file = ProjectFile::from_new(new, Utc::now());
        self.files.push(file.clone());

        self.log_action(file.project_id, format!("File uploaded: {}", file.name));
        self.flush()?;
        Ok(file)
    }

    pub fn file(&self, id: FileId) -> Option<&ProjectFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn files(&self) -> &[ProjectFile] {
        &self.files
    }

    pub fn files_for_project(&self, project_id: ProjectId) -> Vec<&ProjectFile> {
        self.files
            .iter()
            .filter(|f| f.project_id == project_id)
            .collect()
    }

    pub fn update_file(&mut self, id: FileId, patch: FilePatch) -> StoreResult<Option<ProjectFile>> {
        let Some(file) = self.files.iter_mut().find(|f| f.id == id) else {
            return Ok(None);
        };
        file.apply(patch);
        let updated = file.clone();
        self.flush()?;
        Ok(Some(updated))
    }

    pub fn delete_file(&mut self, id: FileId) -> StoreResult<bool> {
        let before = self.files.len();
        self.files.retain(|f| f.id != id);
        if self.files.len() == before {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    // --- History ---

    pub fn add_history_entry(
        &mut self,
        project_id: ProjectId,
        actor: impl Into<String>,
        action: impl Into<String>,
    ) -> StoreResult<HistoryEntry> {
        let entry = self.history.append(project_id, actor, action).clone();
        self.flush()?;
        Ok(entry)
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Entries for one project, newest first.
    pub fn history_for_project(&self, project_id: ProjectId) -> Vec<&HistoryEntry> {
        self.history.for_project(project_id).rev().collect()
    }

    pub fn clear_history(&mut self) -> StoreResult<()> {
        self.history.clear();
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryStorage;
    use crate::model::{ProjectStatus, TaskStatus};

    fn store() -> RecordStore<MemoryStorage> {
        RecordStore::open(MemoryStorage::new(), StoreOptions::default())
    }

    #[test]
    fn progress_follows_task_completion() {
        let mut store = store();
        let project = store.create_project(NewProject::new("Website")).unwrap();
        assert_eq!(project.progress, 0);

        let ids: Vec<TaskId> = (0..3)
            .map(|i| {
                store
                    .create_task(NewTask::new(project.id, format!("task {i}")))
                    .unwrap()
                    .id
            })
            .collect();
        assert_eq!(store.project(project.id).unwrap().progress, 0);

        store
            .update_task(ids[0], TaskPatch::status(TaskStatus::Done))
            .unwrap();
        assert_eq!(store.project(project.id).unwrap().progress, 33);
        assert!(!store.project(project.id).unwrap().is_finished);

        for id in &ids[1..] {
            store
                .update_task(*id, TaskPatch::status(TaskStatus::Done))
                .unwrap();
        }
        let finished = store.project(project.id).unwrap();
        assert_eq!(finished.progress, 100);
        assert!(finished.is_finished);
    }

    #[test]
    fn deleting_last_task_resets_progress() {
        let mut store = store();
        let project = store.create_project(NewProject::new("Website")).unwrap();
        let task = store
            .create_task(NewTask::new(project.id, "only").with_status(TaskStatus::Done))
            .unwrap();
        assert_eq!(store.project(project.id).unwrap().progress, 100);

        assert!(store.delete_task(task.id).unwrap());
        assert_eq!(store.project(project.id).unwrap().progress, 0);
        assert!(store.tasks_for_project(project.id).is_empty());
    }

    #[test]
    fn moving_a_task_updates_both_projects() {
        let mut store = store();
        let a = store.create_project(NewProject::new("A")).unwrap();
        let b = store.create_project(NewProject::new("B")).unwrap();
        let task = store
            .create_task(NewTask::new(a.id, "move me").with_status(TaskStatus::Done))
            .unwrap();
        store
            .create_task(NewTask::new(b.id, "stays"))
            .unwrap();

        store
            .update_task(
                task.id,
                TaskPatch {
                    project_id: Some(b.id),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(store.project(a.id).unwrap().progress, 0);
        assert_eq!(store.project(b.id).unwrap().progress, 50);
    }

    #[test]
    fn finished_flag_survives_new_pending_tasks() {
        let mut store = store();
        let project = store.create_project(NewProject::new("Launch")).unwrap();
        store
            .create_task(NewTask::new(project.id, "done").with_status(TaskStatus::Done))
            .unwrap();
        assert!(store.project(project.id).unwrap().is_finished);

        store.create_task(NewTask::new(project.id, "late addition")).unwrap();
        let project = store.project(project.id).unwrap();
        assert_eq!(project.progress, 50);
        assert!(project.is_finished);
    }

    #[test]
    fn unknown_ids_are_quiet_no_ops() {
        let mut store = store();
        assert!(store
            .update_project(ProjectId::new(), ProjectPatch::default())
            .unwrap()
            .is_none());
        assert!(store
            .update_task(TaskId::new(), TaskPatch::default())
            .unwrap()
            .is_none());
        assert!(!store.delete_project(ProjectId::new()).unwrap());
        assert!(!store.delete_task(TaskId::new()).unwrap());
        assert!(!store.delete_comment(CommentId::new()).unwrap());
        assert!(!store.delete_file(FileId::new()).unwrap());
    }

    #[test]
    fn missing_task_wins_over_missing_target_project() {
        let mut store = store();
        let patch = TaskPatch {
            project_id: Some(ProjectId::new()),
            ..Default::default()
        };
        assert!(store.update_task(TaskId::new(), patch).unwrap().is_none());
    }

    #[test]
    fn moving_an_existing_task_to_a_missing_project_fails() {
        let mut store = store();
        let project = store.create_project(NewProject::new("Home")).unwrap();
        let task = store.create_task(NewTask::new(project.id, "stay")).unwrap();
        let missing = ProjectId::new();

        let result = store.update_task(
            task.id,
            TaskPatch {
                project_id: Some(missing),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(StoreError::UnknownProject(id)) if id == missing));
        assert_eq!(store.task(task.id).unwrap().project_id, project.id);
    }

    #[test]
    fn comment_updates_merge_into_the_stored_record() {
        let mut store = store();
        let project = store.create_project(NewProject::new("Docs")).unwrap();
        let comment = store
            .create_comment(NewComment {
                project_id: project.id,
                author: "Ana".into(),
                content: "first draft".into(),
            })
            .unwrap();

        let updated = store
            .update_comment(
                comment.id,
                CommentPatch {
                    content: Some("second draft".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.content, "second draft");
        assert_eq!(updated.author, "Ana");
        assert_eq!(updated.created_at, comment.created_at);
        assert!(updated.updated_at >= comment.updated_at);
        assert_eq!(store.comment(comment.id), Some(&updated));

        assert!(store
            .update_comment(CommentId::new(), CommentPatch::default())
            .unwrap()
            .is_none());
        assert_eq!(store.comments().len(), 1);
    }

    #[test]
    fn file_updates_merge_into_the_stored_record() {
        let mut store = store();
        let project = store.create_project(NewProject::new("Docs")).unwrap();
        let file = store
            .create_file(NewFile {
                project_id: project.id,
                name: "brief.pdf".into(),
                mime_type: "application/pdf".into(),
                size: 2048,
                location: "/tmp/brief.pdf".into(),
                uploaded_by: "Ana".into(),
            })
            .unwrap();

        let updated = store
            .update_file(
                file.id,
                FilePatch {
                    name: Some("contract.pdf".into()),
                    size: Some(4096),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "contract.pdf");
        assert_eq!(updated.size, 4096);
        assert_eq!(updated.mime_type, "application/pdf");
        assert_eq!(updated.location, "/tmp/brief.pdf");
        assert_eq!(updated.uploaded_by, "Ana");
        assert_eq!(store.file(file.id), Some(&updated));

        assert!(store
            .update_file(FileId::new(), FilePatch::default())
            .unwrap()
            .is_none());
        assert_eq!(store.files().len(), 1);
    }

    #[test]
    fn orphan_children_are_rejected() {
        let mut store = store();
        let missing = ProjectId::new();
        assert!(matches!(
            store.create_task(NewTask::new(missing, "orphan")),
            Err(StoreError::UnknownProject(id)) if id == missing
        ));
        assert!(matches!(
            store.create_comment(NewComment {
                project_id: missing,
                author: String::new(),
                content: "hi".into(),
            }),
            Err(StoreError::UnknownProject(_))
        ));
        assert!(store.tasks().is_empty());
        assert!(store.comments().is_empty());
    }

    #[test]
    fn project_status_done_marks_finished() {
        let mut store = store();
        let project = store.create_project(NewProject::new("Audit")).unwrap();
        let updated = store
            .update_project(
                project.id,
                ProjectPatch {
                    status: Some(ProjectStatus::Done),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert!(updated.is_finished);
        assert!(store
            .history_for_project(project.id)
            .iter()
            .any(|e| e.action == "Project marked as finished"));
    }

    #[test]
    fn history_cap_applies_globally() {
        let mut store = RecordStore::open(
            MemoryStorage::new(),
            StoreOptions {
                history_limit: 5,
                ..Default::default()
            },
        );
        let a = store.create_project(NewProject::new("A")).unwrap();
        let b = store.create_project(NewProject::new("B")).unwrap();
        for i in 0..10 {
            let target = if i % 2 == 0 { a.id } else { b.id };
            store
                .add_history_entry(target, "tester", format!("entry {i}"))
                .unwrap();
        }
        assert_eq!(store.history().len(), 5);
        assert_eq!(
            store.history().iter().last().map(|e| e.action.as_str()),
            Some("entry 9")
        );
        assert_eq!(store.history_for_project(a.id).len(), 2);

        store.clear_history().unwrap();
        assert!(store.history().is_empty());
    }

    #[test]
    fn task_creation_records_history() {
        let mut store = store();
        store.set_actor("Ana");
        let project = store.create_project(NewProject::new("CRM")).unwrap();
        store.create_task(NewTask::new(project.id, "Import leads")).unwrap();

        let entries = store.history_for_project(project.id);
        assert_eq!(entries[0].actor, SYSTEM_ACTOR);
        assert_eq!(entries[0].action, "Progress updated to 0% (0/1 tasks completed)");
        assert_eq!(entries[1].actor, "Ana");
        assert_eq!(entries[1].action, "Task created: Import leads");
    }
}
