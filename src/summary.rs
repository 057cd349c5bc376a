//! Read-only aggregates shown on the dashboard's landing view.

use chrono::NaiveDate;

use crate::currency::{Currency, Rates};
use crate::io::Storage;
use crate::model::{ProjectStatus, TaskStatus};
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub active_projects: usize,
    pub finished_projects: usize,
    pub deleted_projects: usize,
    /// Active projects per status, in declaration order.
    pub projects_by_status: Vec<(ProjectStatus, usize)>,
    /// Tasks of active projects per status, in declaration order.
    pub tasks_by_status: Vec<(TaskStatus, usize)>,
    pub overdue_tasks: usize,
    /// Mean progress over active projects, 0 when there are none.
    pub average_progress: f64,
    /// Estimated value of active projects, converted to `currency`.
    pub total_estimated: f64,
    pub currency: Currency,
}

impl DashboardSummary {
    pub fn compute<S: Storage>(
        store: &RecordStore<S>,
        rates: &Rates,
        currency: Currency,
        today: NaiveDate,
    ) -> Self {
        let active = store.active_projects();

        let mut progress_sum = 0u64;
        let mut total_estimated = 0.0;
        for project in &active {
            progress_sum += u64::from(project.progress);
            total_estimated += rates.convert(project.estimated_value, project.currency, currency);
        }

        let live_tasks: Vec<_> = store
            .tasks()
            .iter()
            .filter(|t| active.iter().any(|p| p.id == t.project_id))
            .collect();

        let tasks_by_status = TaskStatus::ALL
            .iter()
            .map(|&s| (s, live_tasks.iter().filter(|t| t.status == s).count()))
            .collect();

        let average_progress = if active.is_empty() {
            0.0
        } else {
            progress_sum as f64 / active.len() as f64
        };

        Self {
            active_projects: active.len(),
            finished_projects: active.iter().filter(|p| p.is_finished).count(),
            deleted_projects: store.deleted_projects().len(),
            projects_by_status: ProjectStatus::ALL
                .iter()
                .map(|&s| (s, active.iter().filter(|p| p.status == s).count()))
                .collect(),
            tasks_by_status,
            overdue_tasks: live_tasks.iter().filter(|t| t.is_overdue(today)).count(),
            average_progress,
            total_estimated: (total_estimated * 100.0).round() / 100.0,
            currency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryStorage;
    use crate::model::{NewProject, NewTask};
    use crate::store::StoreOptions;

    #[test]
    fn summary_ignores_deleted_projects() {
        let mut store = RecordStore::open(MemoryStorage::new(), StoreOptions::default());
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let mut site = NewProject::new("Site");
        site.estimated_value = 500.0;
        site.currency = Currency::Brl;
        let site = store.create_project(site).unwrap();

        let mut app = NewProject::new("App");
        app.estimated_value = 50.0;
        app.currency = Currency::Usd;
        let app = store.create_project(app).unwrap();

        let gone = store.create_project(NewProject::new("Old")).unwrap();
        store.create_task(NewTask::new(gone.id, "ignored")).unwrap();
        store.delete_project(gone.id).unwrap();

        let mut late = NewTask::new(site.id, "late");
        late.due_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        store.create_task(late).unwrap();
        store
            .create_task(NewTask::new(app.id, "done").with_status(TaskStatus::Done))
            .unwrap();

        let rates = Rates::from_pairs([(Currency::Usd, 1.0), (Currency::Brl, 5.0)]);
        let summary = DashboardSummary::compute(&store, &rates, Currency::Usd, today);

        assert_eq!(summary.active_projects, 2);
        assert_eq!(summary.deleted_projects, 1);
        assert_eq!(summary.finished_projects, 1);
        assert_eq!(summary.overdue_tasks, 1);
        assert_eq!(summary.average_progress, 50.0);
        assert_eq!(summary.total_estimated, 150.0);
        assert_eq!(
            summary.tasks_by_status,
            vec![
                (TaskStatus::Pending, 1),
                (TaskStatus::InProgress, 0),
                (TaskStatus::Done, 1)
            ]
        );
        assert_eq!(summary.projects_by_status[0], (ProjectStatus::NotStarted, 2));
    }
}
