pub mod comment;
pub mod file;
pub mod history;
pub mod id;
pub mod label;
pub mod project;
pub mod task;

pub use comment::{Comment, CommentPatch, NewComment};
pub use file::{FilePatch, NewFile, ProjectFile};
pub use history::{HistoryEntry, HistoryLog, DEFAULT_HISTORY_LIMIT};
pub use id::{CommentId, FileId, HistoryId, ProjectId, TaskId};
pub use label::ParseLabelError;
pub use project::{NewProject, Phase, Priority, Project, ProjectPatch, ProjectStatus};
pub use task::{NewTask, Task, TaskPatch, TaskStatus};
