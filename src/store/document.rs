use log::warn;
use serde::{Deserialize, Serialize};

use crate::io::Storage;
use crate::model::{Comment, HistoryEntry, HistoryLog, Project, ProjectFile, Task};

/// Storage key of the main document.
pub const DOCUMENT_KEY: &str = "pm-dashboard-db";
/// Storage key of the standalone history log.
pub const HISTORY_KEY: &str = "pm-dashboard-history";

/// The persisted state: five flat arrays, no schema version.
///
/// Missing arrays read as empty so older documents still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub comments: Vec<Comment>,
    pub files: Vec<ProjectFile>,
    pub history: Vec<HistoryEntry>,
}

/// Borrowed form of [`Document`] used when flushing, so the store does not
/// clone its collections on every write.
#[derive(Serialize)]
pub(crate) struct DocumentView<'a> {
    pub projects: &'a [Project],
    pub tasks: &'a [Task],
    pub comments: &'a [Comment],
    pub files: &'a [ProjectFile],
    pub history: &'a HistoryLog,
}

impl Serialize for HistoryLog {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Read and parse a JSON value, treating any failure as absence.
pub(crate) fn load_or_default<T, S>(storage: &S, key: &str) -> Option<T>
where
    T: serde::de::DeserializeOwned,
    S: Storage,
{
    let json = match storage.read(key) {
        Ok(Some(json)) => json,
        Ok(None) => return None,
        Err(err) => {
            warn!("could not read `{key}`, starting empty: {err}");
            return None;
        }
    };
    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("stored `{key}` is not valid, starting empty: {err}");
            None
        }
    }
}
