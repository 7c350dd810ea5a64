//! Request and response bodies for the DeptShare HTTP API.
//!
//! All bodies are serialized as JSON. Paths on the wire are relative to
//! the share root and use forward slashes regardless of the server OS.

use serde::{Deserialize, Serialize};

// ============================================================================
// Directory Listing
// ============================================================================

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Folder,
}

/// A single row in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Base name, no separators.
    pub name: String,
    /// Entry kind.
    pub kind: EntryKind,
    /// Size in bytes (0 for folders).
    pub size_bytes: u64,
    /// Last modified timestamp (Unix epoch seconds).
    pub modified_at: u64,
    /// Extension without the leading dot, empty for folders.
    pub extension: String,
    /// Path relative to the share root, forward-slash separated.
    pub relative_path: String,
}

/// One link in the breadcrumb trail above a listing.
///
/// The first breadcrumb is always the share root ("Home") with an empty
/// relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    /// Display name of the segment.
    pub name: String,
    /// Relative path accumulated up to this segment.
    pub relative_path: String,
    /// Whether this segment is the currently listed directory.
    pub is_active: bool,
}

/// Response for a directory listing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    /// Relative path that was listed (empty for the root).
    pub path: String,
    /// Relative path of the parent directory (empty for the root).
    pub parent_path: String,
    /// Entries, folders first, then case-insensitive name order.
    pub entries: Vec<Entry>,
    /// Breadcrumb trail from the root down to `path`.
    pub breadcrumbs: Vec<Breadcrumb>,
}

// ============================================================================
// Mutating Operations
// ============================================================================

/// Per-file failure inside an upload batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFailure {
    /// Name the client supplied for the file.
    pub name: String,
    /// Why this file was not stored.
    pub reason: String,
}

/// Outcome of an upload batch. The batch is not atomic: some files may
/// succeed while others fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    /// Final stored names of successfully uploaded files (after any
    /// collision renaming).
    pub uploaded: Vec<String>,
    /// Folder names created while reconstructing uploaded sub-paths.
    pub created_folders: Vec<String>,
    /// Files that could not be stored.
    pub failed: Vec<UploadFailure>,
    /// Human-readable summary line.
    pub message: String,
}

impl UploadReport {
    /// Build the summary line from the counts, e.g.
    /// `"Uploaded 3 file(s). Created 1 folder(s)."`.
    pub fn summarize(uploaded: Vec<String>, created_folders: Vec<String>, failed: Vec<UploadFailure>) -> Self {
        let mut message = String::new();
        if !uploaded.is_empty() {
            message.push_str(&format!("Uploaded {} file(s). ", uploaded.len()));
        }
        if !created_folders.is_empty() {
            message.push_str(&format!("Created {} folder(s). ", created_folders.len()));
        }
        if !failed.is_empty() {
            message.push_str(&format!("{} file(s) failed.", failed.len()));
        }
        let message = message.trim_end().to_string();
        Self {
            uploaded,
            created_folders,
            failed,
            message,
        }
    }

    /// True if nothing in the batch was stored.
    pub fn is_total_failure(&self) -> bool {
        self.uploaded.is_empty() && self.created_folders.is_empty()
    }
}

/// Request to create a folder under `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    /// Relative path of the parent directory (empty for the root).
    #[serde(default)]
    pub path: String,
    /// Name of the folder to create.
    pub folder_name: String,
}

/// Response after creating a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFolderResponse {
    /// Relative path of the new folder.
    pub relative_path: String,
    /// Human-readable confirmation.
    pub message: String,
}

/// Request to delete a file or folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Relative path of the target. The root itself cannot be deleted.
    pub path: String,
}

/// Response after a deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Human-readable confirmation.
    pub message: String,
}
