use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ProjectId, TaskId};
use super::label::labelled_enum;
use super::project::Priority;

labelled_enum! {
    /// Completion state of a task. Only `Done` counts towards project progress.
    TaskStatus as "task status" {
        Pending => "Pendente" | "pending" | "todo" | "not started" | "new" | "open",
        InProgress => "Em Progresso" | "in progress" | "em andamento" | "active" | "started" | "doing",
        Done => "Concluída" | "concluido" | "done" | "finished" | "complete" | "completed",
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

/// A unit of work belonging to exactly one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignee: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub assignee: String,
}

impl NewTask {
    pub fn new(project_id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            project_id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }
}

/// Partial update for a task. Setting `project_id` moves the task;
/// `due_date: Some(None)` clears the due date.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub project_id: Option<ProjectId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

impl Task {
    pub fn from_new(new: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::new(),
            project_id: new.project_id,
            name: new.name,
            description: new.description,
            status: new.status,
            due_date: new.due_date,
            priority: new.priority,
            assignee: new.assignee,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Past its due date and not yet done.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_done() && self.due_date.is_some_and(|due| due < today)
    }

    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(project_id) = patch.project_id {
            self.project_id = project_id;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(due) = patch.due_date {
            self.due_date = due;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(assignee) = patch.assignee {
            self.assignee = assignee;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overdue_ignores_done_and_undated_tasks() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut task = Task::from_new(NewTask::new(ProjectId::new(), "Deploy"), Utc::now());
        assert!(!task.is_overdue(today));

        task.due_date = NaiveDate::from_ymd_opt(2024, 5, 9);
        assert!(task.is_overdue(today));

        task.status = TaskStatus::Done;
        assert!(!task.is_overdue(today));
    }

    #[test]
    fn due_date_can_be_set_and_cleared() {
        let mut task = Task::from_new(NewTask::new(ProjectId::new(), "Deploy"), Utc::now());
        let due = NaiveDate::from_ymd_opt(2024, 5, 9);
        task.apply(TaskPatch {
            due_date: Some(due),
            ..Default::default()
        });
        assert_eq!(task.due_date, due);

        task.apply(TaskPatch::status(TaskStatus::InProgress));
        assert_eq!(task.due_date, due);

        task.apply(TaskPatch {
            due_date: Some(None),
            ..Default::default()
        });
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn done_status_is_stored_with_feminine_label() {
        let json = serde_json::to_string(&TaskStatus::Done).unwrap();
        assert_eq!(json, "\"Concluída\"");
        assert_eq!("Concluida".parse::<TaskStatus>(), Ok(TaskStatus::Done));
    }
}
