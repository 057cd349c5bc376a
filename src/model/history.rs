use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{HistoryId, ProjectId};

/// Upper bound on retained history entries, across all projects.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Actor label used for entries the store writes on its own behalf.
pub const SYSTEM_ACTOR: &str = "System";

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: HistoryId,
    pub project_id: ProjectId,
    pub actor: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only, bounded activity log. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    limit: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryLog {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Rebuild a log from persisted entries (oldest first), keeping the newest `limit`.
    pub fn from_entries(entries: Vec<HistoryEntry>, limit: usize) -> Self {
        let mut log = Self::with_limit(limit);
        log.entries = entries.into();
        log.evict();
        log
    }

    pub fn append(
        &mut self,
        project_id: ProjectId,
        actor: impl Into<String>,
        action: impl Into<String>,
    ) -> &HistoryEntry {
        self.entries.push_back(HistoryEntry {
            id: HistoryId::new(),
            project_id,
            actor: actor.into(),
            action: action.into(),
            timestamp: Utc::now(),
        });
        self.evict();
        // evict() never drops the entry just pushed since limit >= 1
        &self.entries[self.entries.len() - 1]
    }

    fn evict(&mut self) {
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn for_project(&self, project_id: ProjectId) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.project_id == project_id)
    }

    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_keeps_most_recent_entries() {
        let project = ProjectId::new();
        let mut log = HistoryLog::with_limit(3);
        for i in 0..5 {
            log.append(project, "tester", format!("action {i}"));
        }
        let actions: Vec<_> = log.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, ["action 2", "action 3", "action 4"]);
    }

    #[test]
    fn from_entries_trims_oldest() {
        let project = ProjectId::new();
        let mut source = HistoryLog::with_limit(10);
        for i in 0..6 {
            source.append(project, "tester", format!("a{i}"));
        }
        let log = HistoryLog::from_entries(source.to_vec(), 4);
        assert_eq!(log.len(), 4);
        assert_eq!(log.iter().next().map(|e| e.action.as_str()), Some("a2"));
    }

    #[test]
    fn project_filter_is_global_log_view() {
        let a = ProjectId::new();
        let b = ProjectId::new();
        let mut log = HistoryLog::with_limit(2);
        log.append(a, "x", "first");
        log.append(b, "x", "second");
        log.append(b, "x", "third");
        assert_eq!(log.for_project(a).count(), 0);
        assert_eq!(log.for_project(b).count(), 2);
    }
}
