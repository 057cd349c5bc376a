use std::path::Path;

use super::CsvError;
use crate::model::Task;

/// Export tasks to a semicolon-delimited CSV file matching the import format.
///
/// Columns: Task ; Description ; Status ; Due Date ; Priority ; Assignee
/// Dates are formatted as DD/MM/YYYY.
/// Returns the number of tasks written.
pub fn export_tasks_csv<'a, I>(tasks: I, path: &Path) -> Result<usize, CsvError>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)?;

    wtr.write_record(["Task", "Description", "Status", "Due Date", "Priority", "Assignee"])?;

    let mut count = 0;
    for task in tasks {
        let due = task
            .due_date
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_default();
        wtr.write_record([
            task.name.as_str(),
            task.description.as_str(),
            task.status.label(),
            due.as_str(),
            task.priority.label(),
            task.assignee.as_str(),
        ])?;
        count += 1;
    }

    wtr.flush()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTask, ProjectId, TaskStatus};
    use chrono::{NaiveDate, Utc};

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.csv");

        let mut task = Task::from_new(
            NewTask::new(ProjectId::new(), "Write docs").with_status(TaskStatus::InProgress),
            Utc::now(),
        );
        task.due_date = NaiveDate::from_ymd_opt(2024, 3, 7);
        task.assignee = "Bea".into();

        let written = export_tasks_csv([&task], &path).unwrap();
        assert_eq!(written, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("Task;Description;Status;Due Date;Priority;Assignee")
        );
        assert_eq!(lines.next(), Some("Write docs;;Em Progresso;07/03/2024;Média;Bea"));
    }
}
