use std::path::Path;

use chrono::NaiveDate;
use log::warn;

use super::CsvError;
use crate::model::{NewTask, Priority, ProjectId, TaskStatus};

/// Try parsing a date string with several common formats.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Detect delimiter by checking the first line for common separators.
fn detect_delimiter(first_line: &str) -> u8 {
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    let tabs = first_line.matches('\t').count();

    if semicolons >= commas && semicolons >= tabs {
        b';'
    } else if tabs >= commas {
        b'\t'
    } else {
        b','
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Name,
    Description,
    Status,
    Due,
    Priority,
    Assignee,
}

/// Map a header to a column, ignoring case, accents and separators.
fn header_to_column(header: &str) -> Option<Column> {
    match crate::model::label::fold_label(header).as_str() {
        "name" | "task" | "tasklabel" | "taskname" | "title" | "tarefa" | "nome" => {
            Some(Column::Name)
        }
        "description" | "notes" | "note" | "details" | "descricao" => Some(Column::Description),
        "status" | "state" | "stage" | "situacao" => Some(Column::Status),
        "due" | "duedate" | "deadline" | "end" | "enddate" | "prazo" | "vencimento" => {
            Some(Column::Due)
        }
        "priority" | "pri" | "importance" | "prioridade" => Some(Column::Priority),
        "assignee" | "owner" | "responsible" | "responsavel" | "assignedto" => {
            Some(Column::Assignee)
        }
        _ => None,
    }
}

/// Import tasks for `project_id` from a CSV file.
///
/// Auto-detects delimiter (comma, semicolon, tab) and matches headers
/// flexibly. Rows without a name are skipped; unknown status or priority
/// words fall back to the defaults. Returns `(tasks, skipped_count)`.
pub fn import_tasks_csv(
    path: &Path,
    project_id: ProjectId,
) -> Result<(Vec<NewTask>, usize), CsvError> {
    let content = std::fs::read_to_string(path)?;
    parse_tasks_csv(&content, project_id)
}

pub fn parse_tasks_csv(
    content: &str,
    project_id: ProjectId,
) -> Result<(Vec<NewTask>, usize), CsvError> {
    let first_line = content.lines().next().unwrap_or("");
    let delimiter = detect_delimiter(first_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let columns: Vec<Option<Column>> = headers.iter().map(header_to_column).collect();

    if !columns.contains(&Some(Column::Name)) {
        return Err(CsvError::MissingColumns(
            headers.iter().map(str::to_string).collect(),
        ));
    }

    let mut tasks = Vec::new();
    let mut skipped = 0usize;

    for (i, result) in reader.records().enumerate() {
        let row = i + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping CSV row {row}: {e}");
                skipped += 1;
                continue;
            }
        };

        let field = |wanted: Column| {
            columns
                .iter()
                .position(|c| *c == Some(wanted))
                .and_then(|idx| record.get(idx))
                .filter(|v| !v.is_empty())
        };

        let Some(name) = field(Column::Name) else {
            skipped += 1;
            continue;
        };

        let mut task = NewTask::new(project_id, name);
        task.description = field(Column::Description).unwrap_or_default().to_string();
        task.assignee = field(Column::Assignee).unwrap_or_default().to_string();

        if let Some(raw) = field(Column::Status) {
            task.status = raw.parse().unwrap_or_else(|_| {
                warn!("row {row}: unknown status '{raw}', using {}", TaskStatus::Pending);
                TaskStatus::Pending
            });
        }
        if let Some(raw) = field(Column::Priority) {
            task.priority = raw.parse().unwrap_or_else(|_| {
                warn!("row {row}: unknown priority '{raw}', using {}", Priority::Medium);
                Priority::Medium
            });
        }
        if let Some(raw) = field(Column::Due) {
            task.due_date = parse_date(raw);
            if task.due_date.is_none() {
                warn!("row {row}: ignoring invalid due date '{raw}'");
            }
        }

        tasks.push(task);
    }

    if tasks.is_empty() {
        return Err(CsvError::NoRows { skipped });
    }

    Ok((tasks, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_comma_delimiter_and_flexible_headers() {
        let csv = "Title,Status,Deadline,Owner\n\
                   Design,done,2024-02-01,Caio\n\
                   Build,Em Progresso,01/03/2024,\n\
                   ,Pendente,,\n";
        let project = ProjectId::new();
        let (tasks, skipped) = parse_tasks_csv(csv, project).unwrap();

        assert_eq!(skipped, 1);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].name, "Design");
        assert_eq!(tasks[0].status, TaskStatus::Done);
        assert_eq!(tasks[0].due_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(tasks[0].assignee, "Caio");
        assert_eq!(tasks[1].status, TaskStatus::InProgress);
        assert_eq!(tasks[1].due_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!(tasks.iter().all(|t| t.project_id == project));
    }

    #[test]
    fn semicolon_export_format_reads_back() {
        let csv = "Task;Description;Status;Due Date;Priority;Assignee\n\
                   Write docs;;Concluída;07/03/2024;Alta;Bea\n";
        let (tasks, skipped) = parse_tasks_csv(csv, ProjectId::new()).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(tasks[0].status, TaskStatus::Done);
        assert_eq!(tasks[0].priority, Priority::High);
    }

    #[test]
    fn missing_name_column_is_an_error() {
        let err = parse_tasks_csv("Status;Due\nDone;2024-01-01\n", ProjectId::new()).unwrap_err();
        assert!(matches!(err, CsvError::MissingColumns(_)));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let err = parse_tasks_csv("Task;Status\n", ProjectId::new()).unwrap_err();
        assert!(matches!(err, CsvError::NoRows { skipped: 0 }));
    }
}
