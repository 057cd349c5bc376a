use std::path::Path;

use chrono::Local;
use log::info;
use thiserror::Error;

use crate::config::Config;
use crate::currency::{
    format_amount, Currency, CurrencyConverter, HttpRateSource, RateSource, Rates,
    StaticRateSource,
};
use crate::io::{self, CsvError, FileStorage, Storage};
use crate::model::file::mime_from_name;
use crate::model::{
    CommentId, FileId, NewComment, NewFile, NewProject, NewTask, Project, ProjectId,
    ProjectPatch, TaskId, TaskPatch,
};
use crate::store::{RecordStore, StoreError};
use crate::summary::DashboardSummary;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Csv(#[from] CsvError),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("nothing to export: project has no tasks")]
    NothingToExport,
    /// Rows before the failing one were created and stay in the store.
    #[error("imported {imported} of {total} tasks before failing: {source}")]
    PartialImport {
        imported: usize,
        total: usize,
        #[source]
        source: StoreError,
    },
}

pub type AppResult = Result<String, AppError>;

fn not_found(kind: &'static str, id: impl ToString) -> AppError {
    AppError::NotFound {
        kind,
        id: id.to_string(),
    }
}

/// Which projects a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectFilter {
    #[default]
    Active,
    Deleted,
    All,
}

/// Main application state: the store plus the collaborators commands need.
///
/// Every command returns the text to show the user.
pub struct App<S: Storage> {
    pub store: RecordStore<S>,
    converter: CurrencyConverter,
    display_currency: Currency,
}

impl App<FileStorage> {
    /// Open the file-backed store described by `config`.
    pub fn from_config(config: &Config) -> Self {
        let dir = config.resolved_data_dir();
        info!("data directory: {}", dir.display());
        let store = RecordStore::open(FileStorage::new(dir), config.store_options());

        let source: Box<dyn RateSource> = if config.currency.rates_url.is_empty() {
            Box::new(StaticRateSource(Rates::fallback()))
        } else {
            match HttpRateSource::new(config.currency.rates_url.clone()) {
                Ok(source) => Box::new(source),
                Err(err) => {
                    log::warn!("rate lookup unavailable, using fixed rates: {err}");
                    Box::new(StaticRateSource(Rates::fallback()))
                }
            }
        };
        let converter = CurrencyConverter::with_ttl(source, config.currency.ttl());
        Self::new(store, converter, config.currency.display)
    }
}

impl<S: Storage> App<S> {
    pub fn new(store: RecordStore<S>, converter: CurrencyConverter, display_currency: Currency) -> Self {
        Self {
            store,
            converter,
            display_currency,
        }
    }

    fn require_project(&self, id: ProjectId) -> Result<&Project, AppError> {
        self.store.project(id).ok_or_else(|| not_found("project", id))
    }

    // --- Projects ---

    pub fn add_project(&mut self, new: NewProject) -> AppResult {
        let project = self.store.create_project(new)?;
        Ok(format!("Created project {} ({})", project.name, project.id))
    }

    pub fn list_projects(&self, filter: ProjectFilter) -> String {
        let projects: Vec<&Project> = match filter {
            ProjectFilter::Active => self.store.active_projects(),
            ProjectFilter::Deleted => self.store.deleted_projects(),
            ProjectFilter::All => self.store.projects().iter().collect(),
        };
        if projects.is_empty() {
            return "No projects".to_string();
        }
        projects
            .iter()
            .map(|p| {
                format!(
                    "{}  {:<28} {:<14} {:<13} {:>3}%{}{}",
                    p.id,
                    p.name,
                    p.status,
                    p.phase,
                    p.progress,
                    if p.is_finished { "  [finished]" } else { "" },
                    if p.is_deleted { "  [deleted]" } else { "" },
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn show_project(&self, id: ProjectId) -> AppResult {
        let p = self.require_project(id)?;
        let dates = |d: Option<chrono::NaiveDate>| {
            d.map(|d| d.format("%d/%m/%Y").to_string())
                .unwrap_or_else(|| "-".into())
        };
        let mut lines = vec![
            format!("{} ({})", p.name, p.id),
            format!("  client:      {}", p.client),
            format!("  responsible: {}", p.responsible),
            format!("  status:      {} / {} / {}", p.status, p.phase, p.priority),
            format!("  dates:       {} → {}", dates(p.start_date), dates(p.end_date)),
            format!("  estimated:   {}", format_amount(p.estimated_value, p.currency)),
        ];
        if let Some(final_value) = p.final_value {
            lines.push(format!("  final:       {}", format_amount(final_value, p.currency)));
        }
        if !p.tags.is_empty() {
            lines.push(format!("  tags:        {}", p.tags.join(", ")));
        }
        lines.push(format!(
            "  progress:    {}%{}{}",
            p.progress,
            if p.is_finished { " (finished)" } else { "" },
            if p.is_deleted { " (deleted)" } else { "" },
        ));

        let tasks = self.store.tasks_for_project(id);
        lines.push(format!("Tasks ({}):", tasks.len()));
        lines.extend(
            tasks
                .iter()
                .map(|t| format!("  {}  [{}] {}", t.id, t.status, t.name)),
        );
        lines.push(format!("Comments: {}", self.store.comments_for_project(id).len()));
        lines.push(format!("Files: {}", self.store.files_for_project(id).len()));
        Ok(lines.join("\n"))
    }

    pub fn update_project(&mut self, id: ProjectId, patch: ProjectPatch) -> AppResult {
        match self.store.update_project(id, patch)? {
            Some(p) => Ok(format!("Updated project {} ({}%)", p.name, p.progress)),
            None => Err(not_found("project", id)),
        }
    }

    pub fn delete_project(&mut self, id: ProjectId) -> AppResult {
        if self.store.delete_project(id)? {
            Ok(format!("Project {id} moved to deleted projects"))
        } else {
            Err(not_found("project", id))
        }
    }

    // --- Tasks ---

    pub fn add_task(&mut self, new: NewTask) -> AppResult {
        let task = self.store.create_task(new)?;
        let progress = self
            .store
            .project(task.project_id)
            .map(|p| p.progress)
            .unwrap_or(0);
        Ok(format!(
            "Created task {} ({}); project progress {progress}%",
            task.name, task.id
        ))
    }

    pub fn list_tasks(&self, project: ProjectId) -> AppResult {
        self.require_project(project)?;
        let tasks = self.store.tasks_for_project(project);
        if tasks.is_empty() {
            return Ok("No tasks".to_string());
        }
        let lines: Vec<String> = tasks
            .iter()
            .map(|t| {
                let due = t
                    .due_date
                    .map(|d| d.format("%d/%m/%Y").to_string())
                    .unwrap_or_default();
                format!(
                    "{}  {:<28} {:<13} {:<8} {:<10} {}",
                    t.id, t.name, t.status, t.priority, due, t.assignee
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> AppResult {
        let Some(task) = self.store.update_task(id, patch)? else {
            return Err(not_found("task", id));
        };
        let progress = self
            .store
            .project(task.project_id)
            .map(|p| p.progress)
            .unwrap_or(0);
        Ok(format!(
            "Updated task {} [{}]; project progress {progress}%",
            task.name, task.status
        ))
    }

    pub fn delete_task(&mut self, id: TaskId) -> AppResult {
        if self.store.delete_task(id)? {
            Ok(format!("Deleted task {id}"))
        } else {
            Err(not_found("task", id))
        }
    }

    // --- Comments ---

    pub fn add_comment(&mut self, project: ProjectId, content: String) -> AppResult {
        let author = self.store.actor().to_string();
        let comment = self.store.create_comment(NewComment {
            project_id: project,
            author,
            content,
        })?;
        Ok(format!("Added comment {}", comment.id))
    }

    pub fn list_comments(&self, project: ProjectId) -> AppResult {
        self.require_project(project)?;
        let comments = self.store.comments_for_project(project);
        if comments.is_empty() {
            return Ok("No comments".to_string());
        }
        let lines: Vec<String> = comments
            .iter()
            .map(|c| {
                format!(
                    "{}  {} {}: {}",
                    c.id,
                    c.created_at.with_timezone(&Local).format("%d/%m/%Y %H:%M"),
                    c.author,
                    c.content
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    pub fn delete_comment(&mut self, id: CommentId) -> AppResult {
        if self.store.delete_comment(id)? {
            Ok(format!("Deleted comment {id}"))
        } else {
            Err(not_found("comment", id))
        }
    }

    // --- Files ---

    /// Record a file attachment. When `location` is a readable local path its
    /// size is taken from the filesystem.
    pub fn attach_file(
        &mut self,
        project: ProjectId,
        location: String,
        name: Option<String>,
    ) -> AppResult {
        let path = Path::new(&location);
        let name = name.unwrap_or_else(|| {
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(location.as_str())
                .to_string()
        });
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let file = self.store.create_file(NewFile {
            project_id: project,
            mime_type: mime_from_name(&name).to_string(),
            name,
            size,
            location,
            uploaded_by: self.store.actor().to_string(),
        })?;
        Ok(format!("Attached {} ({} bytes) as {}", file.name, file.size, file.id))
    }

    pub fn list_files(&self, project: ProjectId) -> AppResult {
        self.require_project(project)?;
        let files = self.store.files_for_project(project);
        if files.is_empty() {
            return Ok("No files".to_string());
        }
        let lines: Vec<String> = files
            .iter()
            .map(|f| {
                format!(
                    "{}  {:<28} {:>10} B  {}  {}",
                    f.id, f.name, f.size, f.mime_type, f.location
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    pub fn delete_file(&mut self, id: FileId) -> AppResult {
        if self.store.delete_file(id)? {
            Ok(format!("Deleted file {id}"))
        } else {
            Err(not_found("file", id))
        }
    }

    // --- History ---

    /// Most recent entries first.
    pub fn history(&self, project: Option<ProjectId>, limit: usize) -> String {
        let entries: Vec<_> = match project {
            Some(id) => self.store.history_for_project(id),
            None => self.store.history().iter().rev().collect(),
        };
        if entries.is_empty() {
            return "No history".to_string();
        }
        entries
            .into_iter()
            .take(limit)
            .map(|e| {
                let project = self
                    .store
                    .project(e.project_id)
                    .map(|p| p.name.as_str())
                    .unwrap_or("?");
                format!(
                    "{}  {:<20} {:<10} {}",
                    e.timestamp.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S"),
                    project,
                    e.actor,
                    e.action
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear_history(&mut self) -> AppResult {
        let count = self.store.history().len();
        self.store.clear_history()?;
        Ok(format!("Cleared {count} history entries"))
    }

    // --- Reports ---

    pub fn summary(&mut self, currency: Option<Currency>) -> String {
        let currency = currency.unwrap_or(self.display_currency);
        let today = Local::now().date_naive();
        let rates = self.converter.rates();
        let s = DashboardSummary::compute(&self.store, rates, currency, today);

        let task_counts: Vec<String> = s
            .tasks_by_status
            .iter()
            .map(|(status, count)| format!("{status}: {count}"))
            .collect();

        let mut lines = vec![format!(
            "Projects: {} active, {} finished, {} deleted",
            s.active_projects, s.finished_projects, s.deleted_projects
        )];
        lines.extend(
            s.projects_by_status
                .iter()
                .map(|(status, count)| format!("  {status:<14} {count}")),
        );
        lines.push(format!(
            "Tasks: {} (overdue: {})",
            task_counts.join(", "),
            s.overdue_tasks
        ));
        lines.push(format!("Average progress: {:.1}%", s.average_progress));
        lines.push(format!(
            "Total estimated: {}",
            format_amount(s.total_estimated, s.currency)
        ));
        lines.join("\n")
    }

    pub fn convert(&mut self, amount: f64, from: Currency, to: Currency) -> String {
        let converted = self.converter.convert(amount, from, to);
        format!("{} = {}", format_amount(amount, from), format_amount(converted, to))
    }

    // --- CSV ---

    pub fn export_csv(&self, project: ProjectId, path: &Path) -> AppResult {
        self.require_project(project)?;
        let tasks = self.store.tasks_for_project(project);
        if tasks.is_empty() {
            return Err(AppError::NothingToExport);
        }
        let count = io::export_tasks_csv(tasks, path)?;
        Ok(format!("Exported {count} tasks to {}", path.display()))
    }

    pub fn import_csv(&mut self, project: ProjectId, path: &Path) -> AppResult {
        self.require_project(project)?;
        let (tasks, skipped) = io::import_tasks_csv(path, project)?;
        let total = tasks.len();
        for (imported, task) in tasks.into_iter().enumerate() {
            self.store
                .create_task(task)
                .map_err(|source| AppError::PartialImport {
                    imported,
                    total,
                    source,
                })?;
        }
        if skipped > 0 {
            Ok(format!("Imported {total} tasks ({skipped} rows skipped)"))
        } else {
            Ok(format!("Imported {total} tasks"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{MemoryStorage, StorageError};
    use crate::model::TaskStatus;
    use crate::store::StoreOptions;

    /// Accepts a fixed number of writes, then fails every later one.
    #[derive(Default)]
    struct WriteBudget {
        inner: MemoryStorage,
        writes_left: usize,
    }

    impl Storage for WriteBudget {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.read(key)
        }

        fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.writes_left == 0 {
                return Err(StorageError::Write {
                    key: key.to_string(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.writes_left -= 1;
            self.inner.write(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    fn app() -> App<MemoryStorage> {
        let store = RecordStore::open(MemoryStorage::new(), StoreOptions::default());
        let converter = CurrencyConverter::new(Box::new(StaticRateSource(Rates::fallback())));
        App::new(store, converter, Currency::Usd)
    }

    #[test]
    fn convert_uses_cached_rates() {
        let mut app = app();
        assert_eq!(
            app.convert(100.0, Currency::Brl, Currency::Usd),
            "R$ 100.00 = US$ 20.00"
        );
    }

    #[test]
    fn missing_records_are_reported() {
        let mut app = app();
        let id = ProjectId::new();
        assert!(matches!(
            app.update_project(id, ProjectPatch::default()),
            Err(AppError::NotFound { kind: "project", .. })
        ));
        assert!(matches!(
            app.delete_task(TaskId::new()),
            Err(AppError::NotFound { kind: "task", .. })
        ));
    }

    #[test]
    fn csv_round_trip_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.csv");
        let mut app = app();

        let source = app.store.create_project(NewProject::new("Source")).unwrap();
        app.add_task(NewTask::new(source.id, "One").with_status(TaskStatus::Done))
            .unwrap();
        app.add_task(NewTask::new(source.id, "Two")).unwrap();
        app.export_csv(source.id, &path).unwrap();

        let target = app.store.create_project(NewProject::new("Target")).unwrap();
        let message = app.import_csv(target.id, &path).unwrap();
        assert_eq!(message, "Imported 2 tasks");
        assert_eq!(app.store.project(target.id).unwrap().progress, 50);
    }

    #[test]
    fn export_refuses_empty_projects() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app();
        let project = app.store.create_project(NewProject::new("Empty")).unwrap();
        assert!(matches!(
            app.export_csv(project.id, &dir.path().join("x.csv")),
            Err(AppError::NothingToExport)
        ));
    }

    #[test]
    fn summary_reports_in_display_currency() {
        let mut app = app();
        let mut new = NewProject::new("Paid");
        new.estimated_value = 1000.0;
        new.currency = Currency::Brl;
        app.add_project(new).unwrap();
        let text = app.summary(None);
        assert!(text.contains("Projects: 1 active, 0 finished, 0 deleted"));
        assert!(text.ends_with("Total estimated: US$ 200.00"));
    }

    #[test]
    fn listings_render_one_line_per_record() {
        let mut app = app();
        let project = app.store.create_project(NewProject::new("Portal")).unwrap();
        app.add_task(NewTask::new(project.id, "Design")).unwrap();
        app.add_task(NewTask::new(project.id, "Build")).unwrap();
        app.store.create_project(NewProject::new("Intranet")).unwrap();

        let projects = app.list_projects(ProjectFilter::Active);
        assert_eq!(projects.lines().count(), 2);
        assert!(!projects.ends_with('\n'));

        let tasks = app.list_tasks(project.id).unwrap();
        assert_eq!(tasks.lines().count(), 2);
        assert!(tasks.lines().next().unwrap().contains("Design"));

        let shown = app.show_project(project.id).unwrap();
        assert!(shown.starts_with("Portal ("));
        assert!(shown.contains("Tasks (2):"));
        assert!(shown.ends_with("Files: 0"));
    }

    #[test]
    fn interrupted_import_reports_how_many_rows_landed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.csv");
        std::fs::write(&path, "Task;Status\nOne;Pendente\nTwo;Pendente\nThree;Pendente\n")
            .unwrap();

        let storage = WriteBudget {
            writes_left: usize::MAX,
            ..Default::default()
        };
        let store = RecordStore::open(storage, StoreOptions::default());
        let converter = CurrencyConverter::new(Box::new(StaticRateSource(Rates::fallback())));
        let mut app = App::new(store, converter, Currency::Brl);
        let project = app.store.create_project(NewProject::new("Import")).unwrap();

        // Each create flushes the document and the history log.
        app.store.storage_mut().writes_left = 2;
        match app.import_csv(project.id, &path) {
            Err(AppError::PartialImport {
                imported,
                total,
                source: StoreError::Persist(_),
            }) => {
                assert_eq!(imported, 1);
                assert_eq!(total, 3);
            }
            other => panic!("expected a partial import, got {other:?}"),
        }
    }
}
