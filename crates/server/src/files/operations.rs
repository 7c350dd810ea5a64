//! File operations: download, folder creation, upload, delete.
//!
//! Every operation takes a path that has already been resolved (and,
//! for writes, authorized). Uploads are staged through a temporary file
//! and renamed into place so a dropped connection never leaves a
//! truncated file under its final name.

use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use super::resolver::{has_drive_prefix, strip_control_chars, ResolvedPath, RESERVED_NAME_CHARS};

/// Errors that can occur during file operations.
#[derive(Debug, Error)]
pub enum OpError {
    /// No file or folder at the resolved path.
    #[error("file or folder not found: {0:?}")]
    NotFound(String),

    /// Folder create collision.
    #[error("a file or folder named {0:?} already exists")]
    AlreadyExists(String),

    /// Name was empty after control-character stripping.
    #[error("name cannot be empty")]
    EmptyName,

    /// Name contains separators, reserved characters, or traversal
    /// segments.
    #[error("name contains invalid characters: {0:?}")]
    InvalidName(String),

    /// Deleting the share root is never permitted.
    #[error("the share root cannot be deleted")]
    RootDeletion,

    /// A single file exceeds the configured size limit.
    #[error("file too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge {
        /// Actual file size.
        size: u64,
        /// Configured limit.
        limit: u64,
    },

    /// Underlying filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What was deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteKind {
    /// A single file (or symlink).
    File,
    /// A folder and its entire subtree.
    Folder,
}

/// An open file ready for streaming to the client.
#[derive(Debug)]
pub struct Download {
    /// Open handle positioned at the start.
    pub file: File,
    /// Base name to suggest to the client.
    pub name: String,
    /// Total size in bytes.
    pub size: u64,
}

/// One file in an upload batch. `name` may carry forward- or
/// backslash-separated sub-path segments when the client uploads a
/// folder structure.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Client-supplied name, possibly with a relative sub-path.
    pub name: String,
    /// File content; empty is valid.
    pub data: Bytes,
}

/// Per-batch upload outcome. The batch is not atomic: `uploaded` and
/// `failed` can both be non-empty.
#[derive(Debug, Default)]
pub struct UploadOutcome {
    /// Final stored base names, after collision renaming.
    pub uploaded: Vec<String>,
    /// Names of folders created while reconstructing sub-paths.
    pub created_folders: Vec<String>,
    /// Files that could not be stored, with the reason.
    pub failed: Vec<(String, OpError)>,
}

/// Implements the four file operations beneath the share root.
pub struct FileOperations {
    staging_dir: PathBuf,
    max_file_size: u64,
}

impl FileOperations {
    /// Create a new operations handler.
    pub fn new(max_file_size: u64) -> Self {
        let staging_dir = std::env::temp_dir().join("deptshare-staging");
        Self {
            staging_dir,
            max_file_size,
        }
    }

    /// Set the staging directory for uploads.
    pub fn with_staging_dir(mut self, staging_dir: PathBuf) -> Self {
        self.staging_dir = staging_dir;
        self
    }

    /// Open a file for download.
    ///
    /// Fails `NotFound` unless the resolved path is a regular file.
    pub fn open_download(&self, target: &ResolvedPath) -> Result<Download, OpError> {
        let metadata = fs::metadata(target.absolute()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OpError::NotFound(target.relative_str())
            } else {
                OpError::Io(e)
            }
        })?;

        if !metadata.is_file() {
            return Err(OpError::NotFound(target.relative_str()));
        }

        let name = target
            .absolute()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Download {
            file: File::open(target.absolute())?,
            name,
            size: metadata.len(),
        })
    }

    /// Create a folder directly under an existing parent directory.
    ///
    /// The parent must already exist; this operation never creates
    /// intermediate directories. Returns the new folder's wire-form
    /// relative path.
    pub fn create_folder(
        &self,
        parent: &ResolvedPath,
        raw_name: &str,
    ) -> Result<String, OpError> {
        let name = strip_control_chars(raw_name).trim().to_string();
        if name.is_empty() {
            return Err(OpError::EmptyName);
        }
        if name == "." || name == ".." || name.contains(RESERVED_NAME_CHARS) {
            return Err(OpError::InvalidName(name));
        }

        let parent_meta = fs::metadata(parent.absolute()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OpError::NotFound(parent.relative_str())
            } else {
                OpError::Io(e)
            }
        })?;
        if !parent_meta.is_dir() {
            return Err(OpError::NotFound(parent.relative_str()));
        }

        let target = parent.absolute().join(&name);
        if target.exists() {
            return Err(OpError::AlreadyExists(name));
        }

        fs::create_dir(&target)?;

        Ok(if parent.is_root() {
            name
        } else {
            format!("{}/{}", parent.relative_str(), name)
        })
    }

    /// Store a batch of uploaded files into an existing target
    /// directory.
    ///
    /// Files carrying a sub-path get their intermediate directories
    /// created as needed. Name collisions are resolved by inserting a
    /// numeric disambiguator before the extension. One failing file
    /// does not abort the rest of the batch.
    pub fn upload(
        &self,
        target: &ResolvedPath,
        files: Vec<UploadFile>,
    ) -> Result<UploadOutcome, OpError> {
        let target_meta = fs::metadata(target.absolute()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OpError::NotFound(target.relative_str())
            } else {
                OpError::Io(e)
            }
        })?;
        if !target_meta.is_dir() {
            return Err(OpError::NotFound(target.relative_str()));
        }

        let mut outcome = UploadOutcome::default();
        for file in files {
            match self.store_one(target.absolute(), &file, &mut outcome.created_folders) {
                Ok(stored_name) => outcome.uploaded.push(stored_name),
                Err(e) => {
                    warn!(name = %file.name, error = %e, "Upload of one file failed");
                    outcome.failed.push((file.name, e));
                }
            }
        }

        Ok(outcome)
    }

    fn store_one(
        &self,
        target_abs: &Path,
        file: &UploadFile,
        created_folders: &mut Vec<String>,
    ) -> Result<String, OpError> {
        let size = file.data.len() as u64;
        if size > self.max_file_size {
            return Err(OpError::TooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        let segments = split_upload_name(&file.name)?;
        let (filename, parents) = segments.split_last().expect("validated non-empty");

        // Recreate the uploaded folder structure beneath the target.
        let mut dir = target_abs.to_path_buf();
        for segment in parents {
            dir = dir.join(segment);
            if !dir.exists() {
                fs::create_dir(&dir)?;
                if !created_folders.iter().any(|f| f == segment) {
                    created_folders.push(segment.clone());
                }
            }
        }

        let final_path = next_free_path(&dir, filename);

        // Stage then rename so no reader ever sees a half-written file
        // under its final name.
        fs::create_dir_all(&self.staging_dir)?;
        let staged = self
            .staging_dir
            .join(format!("upload-{}.part", Uuid::new_v4()));

        let mut handle = File::create(&staged)?;
        handle.write_all(&file.data)?;
        drop(handle);

        if let Err(e) = fs::rename(&staged, &final_path) {
            if let Err(cleanup) = fs::remove_file(&staged) {
                warn!(path = %staged.display(), error = %cleanup, "Failed to remove staged upload");
            }
            return Err(OpError::Io(e));
        }

        Ok(final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default())
    }

    /// Delete a file or folder.
    ///
    /// The share root is refused. Delete-blocking permission bits are
    /// cleared (best-effort) on the target and everything beneath it
    /// before removal, so read-only content does not wedge the delete.
    pub fn delete(&self, target: &ResolvedPath) -> Result<DeleteKind, OpError> {
        if target.is_root() {
            return Err(OpError::RootDeletion);
        }

        let metadata = fs::symlink_metadata(target.absolute()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OpError::NotFound(target.relative_str())
            } else {
                OpError::Io(e)
            }
        })?;

        clear_delete_blockers(target.absolute());

        if metadata.is_dir() {
            fs::remove_dir_all(target.absolute())?;
            Ok(DeleteKind::Folder)
        } else {
            fs::remove_file(target.absolute())?;
            Ok(DeleteKind::File)
        }
    }
}

/// Split a client-supplied upload name into sanitized segments.
///
/// Accepts both separator styles. Traversal segments and absolute
/// prefixes fail the file; they never fall through to the filesystem.
fn split_upload_name(raw: &str) -> Result<Vec<String>, OpError> {
    let cleaned = strip_control_chars(raw);
    if cleaned.starts_with('/') || cleaned.starts_with('\\') || has_drive_prefix(&cleaned) {
        return Err(OpError::InvalidName(cleaned));
    }

    let mut segments = Vec::new();
    for segment in cleaned.replace('\\', "/").split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(OpError::InvalidName(cleaned.clone())),
            _ => segments.push(segment.to_string()),
        }
    }

    if segments.is_empty() {
        return Err(OpError::EmptyName);
    }
    Ok(segments)
}

/// First non-existing path for `filename` in `dir`, inserting
/// ` (1)`, ` (2)`, ... before the extension on collision.
fn next_free_path(dir: &Path, filename: &str) -> PathBuf {
    let mut candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let dot_ext = Path::new(filename)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        candidate = dir.join(format!("{stem} ({counter}){dot_ext}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Clear permission bits that would block deletion, recursively.
/// Best-effort: failures are logged and the delete proceeds to surface
/// its own error if the block persists.
#[cfg(unix)]
fn clear_delete_blockers(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = fs::symlink_metadata(path) else {
        return;
    };
    if metadata.file_type().is_symlink() {
        return;
    }

    let mode = metadata.permissions().mode();
    // Directories need owner rwx to enumerate and unlink children.
    let wanted = if metadata.is_dir() {
        mode | 0o700
    } else {
        mode | 0o200
    };
    if wanted != mode {
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(wanted)) {
            warn!(path = %path.display(), error = %e, "Failed to clear permission bits before delete");
        }
    }

    if metadata.is_dir() {
        if let Ok(entries) = fs::read_dir(path) {
            for entry in entries.flatten() {
                clear_delete_blockers(&entry.path());
            }
        }
    }
}

#[cfg(not(unix))]
fn clear_delete_blockers(path: &Path) {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return;
    };

    let mut perms = metadata.permissions();
    if perms.readonly() {
        perms.set_readonly(false);
        if let Err(e) = fs::set_permissions(path, perms) {
            warn!(path = %path.display(), error = %e, "Failed to clear read-only attribute before delete");
        }
    }

    if metadata.is_dir() {
        if let Ok(entries) = fs::read_dir(path) {
            for entry in entries.flatten() {
                clear_delete_blockers(&entry.path());
            }
        }
    }
}
