use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CommentId, ProjectId};

/// A note left on a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub project_id: ProjectId,
    #[serde(default)]
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub project_id: ProjectId,
    pub author: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct CommentPatch {
    pub author: Option<String>,
    pub content: Option<String>,
}

impl Comment {
    pub fn from_new(new: NewComment, now: DateTime<Utc>) -> Self {
        Self {
            id: CommentId::new(),
            project_id: new.project_id,
            author: new.author,
            content: new.content,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: CommentPatch) {
        if let Some(author) = patch.author {
            self.author = author;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        self.updated_at = Utc::now();
    }
}
