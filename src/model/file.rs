use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{FileId, ProjectId};

/// Metadata for a document attached to a project. The bytes live elsewhere;
/// `location` is a path or URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub id: FileId,
    pub project_id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewFile {
    pub project_id: ProjectId,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub location: String,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct FilePatch {
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
    pub location: Option<String>,
}

impl ProjectFile {
    pub fn from_new(new: NewFile, now: DateTime<Utc>) -> Self {
        Self {
            id: FileId::new(),
            project_id: new.project_id,
            name: new.name,
            mime_type: new.mime_type,
            size: new.size,
            location: new.location,
            uploaded_by: new.uploaded_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: FilePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(mime_type) = patch.mime_type {
            self.mime_type = mime_type;
        }
        if let Some(size) = patch.size {
            self.size = size;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        self.updated_at = Utc::now();
    }
}

/// Guess a MIME type from a file extension.
pub fn mime_from_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::mime_from_name;

    #[test]
    fn mime_guess_uses_extension() {
        assert_eq!(mime_from_name("Contract.PDF"), "application/pdf");
        assert_eq!(mime_from_name("notes"), "application/octet-stream");
        assert_eq!(mime_from_name("data.tar.zip"), "application/zip");
    }
}
