use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::id::ProjectId;
use super::label::labelled_enum;
use crate::currency::Currency;

labelled_enum! {
    /// Urgency of a project or task.
    Priority as "priority" {
        Low => "Baixa" | "low",
        Medium => "Média" | "medium" | "med" | "normal",
        High => "Alta" | "high",
        Critical => "Crítica" | "critical" | "urgent" | "urgente",
    }
}

labelled_enum! {
    /// Lifecycle status of a project.
    ProjectStatus as "project status" {
        NotStarted => "Não Iniciado" | "not started" | "new",
        InProgress => "Em Andamento" | "in progress" | "active",
        Paused => "Pausado" | "paused" | "on hold",
        Cancelled => "Cancelado" | "cancelled" | "canceled",
        Done => "Concluído" | "done" | "finished" | "completed",
    }
}

labelled_enum! {
    /// Management phase a project is in.
    Phase as "phase" {
        Initiation => "Iniciação" | "initiation",
        Planning => "Planejamento" | "planning",
        Execution => "Execução" | "execution",
        Monitoring => "Monitoramento" | "monitoring",
        Closing => "Encerramento" | "closing",
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::NotStarted
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Initiation
    }
}

/// Percentage of completed tasks, rounded half up. Zero when there are no tasks.
pub fn completion_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    ((200 * completed + total) / (2 * total)) as u8
}

/// A top-level unit of work tracked on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub responsible: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub phase: Phase,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_value: f64,
    pub final_value: Option<f64>,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Derived from the project's tasks; never set directly.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_finished: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a project.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub client: String,
    pub responsible: String,
    pub priority: Priority,
    pub status: ProjectStatus,
    pub phase: Phase,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub estimated_value: f64,
    pub final_value: Option<f64>,
    pub currency: Currency,
    pub tags: Vec<String>,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Partial update for a project. `None` leaves the field untouched; for the
/// optional fields `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub client: Option<String>,
    pub responsible: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<ProjectStatus>,
    pub phase: Option<Phase>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub estimated_value: Option<f64>,
    pub final_value: Option<Option<f64>>,
    pub currency: Option<Currency>,
    pub tags: Option<Vec<String>>,
    /// Explicit override of the finished flag; the only way to clear it.
    pub is_finished: Option<bool>,
}

impl Project {
    pub fn from_new(new: NewProject, now: DateTime<Utc>) -> Self {
        let is_finished = new.status == ProjectStatus::Done;
        Self {
            id: ProjectId::new(),
            name: new.name,
            client: new.client,
            responsible: new.responsible,
            priority: new.priority,
            status: new.status,
            phase: new.phase,
            start_date: new.start_date,
            end_date: new.end_date,
            estimated_value: new.estimated_value,
            final_value: new.final_value,
            currency: new.currency,
            tags: new.tags,
            progress: 0,
            is_deleted: false,
            is_finished,
            created_at: now,
            updated_at: now,
        }
    }

    /// Touch the modified timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Merge a patch into the project.
    ///
    /// `is_finished` only ever turns on from a status change; an explicit
    /// `patch.is_finished` wins over that.
    pub fn apply(&mut self, patch: ProjectPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(client) = patch.client {
            self.client = client;
        }
        if let Some(responsible) = patch.responsible {
            self.responsible = responsible;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(phase) = patch.phase {
            self.phase = phase;
        }
        if let Some(start) = patch.start_date {
            self.start_date = start;
        }
        if let Some(end) = patch.end_date {
            self.end_date = end;
        }
        if let Some(value) = patch.estimated_value {
            self.estimated_value = value;
        }
        if let Some(value) = patch.final_value {
            self.final_value = value;
        }
        if let Some(currency) = patch.currency {
            self.currency = currency;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }

        self.is_finished = match patch.is_finished {
            Some(explicit) => explicit,
            None => self.is_finished || self.status == ProjectStatus::Done,
        };
        self.touch();
    }

    /// Store a freshly derived progress value.
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
        self.is_finished =
            self.is_finished || self.progress == 100 || self.status == ProjectStatus::Done;
        self.touch();
    }
}
