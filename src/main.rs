use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::warn;

use pm_dashboard::app::{App, AppResult, ProjectFilter};
use pm_dashboard::config::Config;
use pm_dashboard::logging::init_logging;
use pm_dashboard::model::{
    CommentId, FileId, NewProject, NewTask, Phase, Priority, ProjectId, ProjectPatch,
    ProjectStatus, TaskId, TaskPatch, TaskStatus,
};
use pm_dashboard::Currency;

#[derive(Parser)]
#[command(name = "pm-dashboard", version, about = "Project-management dashboard")]
struct Cli {
    /// Config file (default: OS config dir/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Directory holding the data files (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Name recorded on history entries (overrides config)
    #[arg(long, global = true)]
    actor: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, list, show, update and delete projects
    #[command(subcommand)]
    Project(ProjectCmd),
    /// Manage a project's tasks
    #[command(subcommand)]
    Task(TaskCmd),
    /// Manage a project's comments
    #[command(subcommand)]
    Comment(CommentCmd),
    /// Manage a project's file attachments
    #[command(subcommand)]
    File(FileCmd),
    /// Show or clear the activity log
    #[command(subcommand)]
    History(HistoryCmd),
    /// Dashboard totals
    Summary {
        /// Currency to report values in
        #[arg(long)]
        currency: Option<Currency>,
    },
    /// Convert an amount between currencies
    Convert {
        amount: f64,
        from: Currency,
        to: Currency,
    },
    /// Export a project's tasks to CSV
    ExportCsv { project: ProjectId, path: PathBuf },
    /// Import tasks from CSV into a project
    ImportCsv { project: ProjectId, path: PathBuf },
}

#[derive(Args)]
struct ProjectFields {
    #[arg(long)]
    client: Option<String>,
    #[arg(long)]
    responsible: Option<String>,
    #[arg(long)]
    priority: Option<Priority>,
    #[arg(long)]
    status: Option<ProjectStatus>,
    #[arg(long)]
    phase: Option<Phase>,
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// End date (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
    #[arg(long)]
    estimate: Option<f64>,
    #[arg(long = "final")]
    final_value: Option<f64>,
    #[arg(long)]
    currency: Option<Currency>,
    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    tags: Option<Vec<String>>,
}

/// Flags that remove a stored optional value.
#[derive(Args)]
struct ProjectClear {
    #[arg(long, conflicts_with = "start")]
    clear_start: bool,
    #[arg(long, conflicts_with = "end")]
    clear_end: bool,
    #[arg(long, conflicts_with = "final_value")]
    clear_final: bool,
}

#[derive(Subcommand)]
enum ProjectCmd {
    Add {
        name: String,
        #[command(flatten)]
        fields: ProjectFields,
    },
    List {
        /// Show soft-deleted projects instead
        #[arg(long, conflicts_with = "all")]
        deleted: bool,
        #[arg(long)]
        all: bool,
    },
    Show {
        id: ProjectId,
    },
    Update {
        id: ProjectId,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ProjectFields,
        /// Explicitly set or clear the finished flag
        #[arg(long)]
        finished: Option<bool>,
        #[command(flatten)]
        clear: ProjectClear,
    },
    Delete {
        id: ProjectId,
    },
}

#[derive(Args)]
struct TaskFields {
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    status: Option<TaskStatus>,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    due: Option<NaiveDate>,
    #[arg(long)]
    priority: Option<Priority>,
    #[arg(long)]
    assignee: Option<String>,
}

#[derive(Subcommand)]
enum TaskCmd {
    Add {
        project: ProjectId,
        name: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    List {
        project: ProjectId,
    },
    Update {
        id: TaskId,
        #[arg(long)]
        name: Option<String>,
        /// Move the task to another project
        #[arg(long)]
        project: Option<ProjectId>,
        #[command(flatten)]
        fields: TaskFields,
        /// Remove the due date
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
    },
    Delete {
        id: TaskId,
    },
}

#[derive(Subcommand)]
enum CommentCmd {
    Add { project: ProjectId, content: String },
    List { project: ProjectId },
    Delete { id: CommentId },
}

#[derive(Subcommand)]
enum FileCmd {
    /// Attach a file by path or URL
    Add {
        project: ProjectId,
        location: String,
        #[arg(long)]
        name: Option<String>,
    },
    List {
        project: ProjectId,
    },
    Delete {
        id: FileId,
    },
}

#[derive(Subcommand)]
enum HistoryCmd {
    List {
        #[arg(long)]
        project: Option<ProjectId>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    Clear,
}

/// `Some(None)` when the clear flag is set, otherwise the new value if given.
fn nullable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

fn project_patch(
    name: Option<String>,
    f: ProjectFields,
    finished: Option<bool>,
    clear: ProjectClear,
) -> ProjectPatch {
    ProjectPatch {
        name,
        client: f.client,
        responsible: f.responsible,
        priority: f.priority,
        status: f.status,
        phase: f.phase,
        start_date: nullable(f.start, clear.clear_start),
        end_date: nullable(f.end, clear.clear_end),
        estimated_value: f.estimate,
        final_value: nullable(f.final_value, clear.clear_final),
        currency: f.currency,
        tags: f.tags,
        is_finished: finished,
    }
}

fn new_project(name: String, f: ProjectFields) -> NewProject {
    NewProject {
        name,
        client: f.client.unwrap_or_default(),
        responsible: f.responsible.unwrap_or_default(),
        priority: f.priority.unwrap_or_default(),
        status: f.status.unwrap_or_default(),
        phase: f.phase.unwrap_or_default(),
        start_date: f.start,
        end_date: f.end,
        estimated_value: f.estimate.unwrap_or_default(),
        final_value: f.final_value,
        currency: f.currency.unwrap_or_default(),
        tags: f.tags.unwrap_or_default(),
    }
}

fn run<S: pm_dashboard::io::Storage>(app: &mut App<S>, command: Commands) -> AppResult {
    match command {
        Commands::Project(cmd) => match cmd {
            ProjectCmd::Add { name, fields } => app.add_project(new_project(name, fields)),
            ProjectCmd::List { deleted, all } => {
                let filter = if all {
                    ProjectFilter::All
                } else if deleted {
                    ProjectFilter::Deleted
                } else {
                    ProjectFilter::Active
                };
                Ok(app.list_projects(filter))
            }
            ProjectCmd::Show { id } => app.show_project(id),
            ProjectCmd::Update {
                id,
                name,
                fields,
                finished,
                clear,
            } => app.update_project(id, project_patch(name, fields, finished, clear)),
            ProjectCmd::Delete { id } => app.delete_project(id),
        },
        Commands::Task(cmd) => match cmd {
            TaskCmd::Add {
                project,
                name,
                fields,
            } => app.add_task(NewTask {
                project_id: project,
                name,
                description: fields.description.unwrap_or_default(),
                status: fields.status.unwrap_or_default(),
                due_date: fields.due,
                priority: fields.priority.unwrap_or_default(),
                assignee: fields.assignee.unwrap_or_default(),
            }),
            TaskCmd::List { project } => app.list_tasks(project),
            TaskCmd::Update {
                id,
                name,
                project,
                fields,
                clear_due,
            } => app.update_task(
                id,
                TaskPatch {
                    project_id: project,
                    name,
                    description: fields.description,
                    status: fields.status,
                    due_date: nullable(fields.due, clear_due),
                    priority: fields.priority,
                    assignee: fields.assignee,
                },
            ),
            TaskCmd::Delete { id } => app.delete_task(id),
        },
        Commands::Comment(cmd) => match cmd {
            CommentCmd::Add { project, content } => app.add_comment(project, content),
            CommentCmd::List { project } => app.list_comments(project),
            CommentCmd::Delete { id } => app.delete_comment(id),
        },
        Commands::File(cmd) => match cmd {
            FileCmd::Add {
                project,
                location,
                name,
            } => app.attach_file(project, location, name),
            FileCmd::List { project } => app.list_files(project),
            FileCmd::Delete { id } => app.delete_file(id),
        },
        Commands::History(cmd) => match cmd {
            HistoryCmd::List { project, limit } => Ok(app.history(project, limit)),
            HistoryCmd::Clear => app.clear_history(),
        },
        Commands::Summary { currency } => Ok(app.summary(currency)),
        Commands::Convert { amount, from, to } => Ok(app.convert(amount, from, to)),
        Commands::ExportCsv { project, path } => app.export_csv(project, &path),
        Commands::ImportCsv { project, path } => app.import_csv(project, &path),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (mut config, config_error) = Config::load(cli.config.as_deref());
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(actor) = cli.actor {
        config.actor = actor;
    }

    let _logger = match init_logging(&config.log_level) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err}");
            None
        }
    };
    if let Some(err) = config_error {
        warn!("{err}; using default settings");
    }

    let mut app = App::from_config(&config);
    match run(&mut app, cli.command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
