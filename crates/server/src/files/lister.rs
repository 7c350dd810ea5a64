//! Directory listing with deterministic ordering.
//!
//! Listings enumerate the immediate children of an already-resolved
//! directory and return wire-ready entries. The filesystem is the
//! source of truth; every listing reads it fresh.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use protocol::messages::{Breadcrumb, Entry, EntryKind};
use thiserror::Error;

use super::resolver::{PathResolver, ResolvedPath};

/// Errors that can occur while listing a directory.
#[derive(Debug, Error)]
pub enum ListError {
    /// The directory does not exist.
    #[error("directory does not exist: {0}")]
    NotFound(String),

    /// The path exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// IO error. A failed stat on any child fails the whole listing;
    /// truncated listings are never returned.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lists directories beneath the share root.
pub struct DirectoryLister {
    resolver: Arc<PathResolver>,
}

impl DirectoryLister {
    /// Create a lister over the given resolver's root.
    pub fn new(resolver: Arc<PathResolver>) -> Self {
        Self { resolver }
    }

    /// List the immediate children of a resolved directory.
    ///
    /// Entries are ordered folders-first, then case-insensitive name
    /// ascending, independent of filesystem enumeration order.
    pub fn list(&self, dir: &ResolvedPath) -> Result<Vec<Entry>, ListError> {
        let absolute = dir.absolute();

        let metadata = fs::metadata(absolute).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ListError::NotFound(dir.relative_str())
            } else {
                ListError::Io(e)
            }
        })?;
        if !metadata.is_dir() {
            return Err(ListError::NotADirectory(dir.relative_str()));
        }

        let mut entries = Vec::new();
        for dirent in fs::read_dir(absolute)? {
            let dirent = dirent?;
            let metadata = dirent.metadata()?;
            let name = dirent.file_name().to_string_lossy().into_owned();

            let kind = if metadata.is_dir() {
                EntryKind::Folder
            } else {
                EntryKind::File
            };

            let extension = match kind {
                EntryKind::Folder => String::new(),
                EntryKind::File => Path::new(&name)
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            };

            let relative_path = self
                .resolver
                .relativize(&dirent.path())
                .unwrap_or_else(|| name.clone());

            entries.push(Entry {
                name,
                kind,
                size_bytes: match kind {
                    EntryKind::Folder => 0,
                    EntryKind::File => metadata.len(),
                },
                modified_at: epoch_seconds(metadata.modified()?),
                extension,
                relative_path,
            });
        }

        // Folders before files, then case-insensitive name.
        entries.sort_by(|a, b| {
            let a_is_folder = a.kind == EntryKind::Folder;
            let b_is_folder = b.kind == EntryKind::Folder;
            b_is_folder
                .cmp(&a_is_folder)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });

        Ok(entries)
    }
}

/// Build the breadcrumb trail for a wire-form relative path.
///
/// A pure function of the path string: the first crumb is always the
/// root ("Home", empty path); subsequent crumbs accumulate prefixes.
pub fn breadcrumbs(relative: &str) -> Vec<Breadcrumb> {
    let mut crumbs = vec![Breadcrumb {
        name: "Home".to_string(),
        relative_path: String::new(),
        is_active: relative.is_empty(),
    }];

    if relative.is_empty() {
        return crumbs;
    }

    let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
    let mut accumulated = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if !accumulated.is_empty() {
            accumulated.push('/');
        }
        accumulated.push_str(segment);
        crumbs.push(Breadcrumb {
            name: (*segment).to_string(),
            relative_path: accumulated.clone(),
            is_active: i == segments.len() - 1,
        });
    }

    crumbs
}

/// Wire-form relative path of the parent directory; empty for the root
/// and for top-level entries.
pub fn parent_path(relative: &str) -> String {
    match relative.rsplit_once('/') {
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    }
}

fn epoch_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Arc<PathResolver>, DirectoryLister) {
        let temp = TempDir::new().unwrap();
        let resolver = Arc::new(PathResolver::new(temp.path()).unwrap());
        let lister = DirectoryLister::new(resolver.clone());
        (temp, resolver, lister)
    }

    #[test]
    fn test_list_entries_and_metadata() {
        let (temp, resolver, lister) = fixture();
        fs::create_dir_all(temp.path().join("IT/Projects")).unwrap();
        fs::write(temp.path().join("IT/notes.txt"), "hello").unwrap();

        let dir = resolver.resolve("IT").unwrap();
        let entries = lister.list(&dir).unwrap();

        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].name, "Projects");
        assert_eq!(entries[0].kind, EntryKind::Folder);
        assert_eq!(entries[0].size_bytes, 0);
        assert_eq!(entries[0].extension, "");
        assert_eq!(entries[0].relative_path, "IT/Projects");

        assert_eq!(entries[1].name, "notes.txt");
        assert_eq!(entries[1].kind, EntryKind::File);
        assert_eq!(entries[1].size_bytes, 5);
        assert_eq!(entries[1].extension, "txt");
        assert_eq!(entries[1].relative_path, "IT/notes.txt");
        assert!(entries[1].modified_at > 0);
    }

    #[test]
    fn test_sort_folders_first_then_name_case_insensitive() {
        let (temp, resolver, lister) = fixture();
        fs::write(temp.path().join("zebra.txt"), "z").unwrap();
        fs::write(temp.path().join("Apple.txt"), "a").unwrap();
        fs::create_dir(temp.path().join("beta")).unwrap();
        fs::create_dir(temp.path().join("Alpha")).unwrap();

        let root = resolver.resolve("").unwrap();
        let entries = lister.list(&root).unwrap();

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta", "Apple.txt", "zebra.txt"]);
    }

    #[test]
    fn test_list_missing_directory() {
        let (_temp, resolver, lister) = fixture();
        let dir = resolver.resolve("nope").unwrap();
        assert!(matches!(lister.list(&dir), Err(ListError::NotFound(_))));
    }

    #[test]
    fn test_list_file_is_not_a_directory() {
        let (temp, resolver, lister) = fixture();
        fs::write(temp.path().join("file.txt"), "x").unwrap();

        let dir = resolver.resolve("file.txt").unwrap();
        assert!(matches!(lister.list(&dir), Err(ListError::NotADirectory(_))));
    }

    #[test]
    fn test_round_trip_through_resolver() {
        let (temp, resolver, lister) = fixture();
        fs::create_dir(temp.path().join("Sales")).unwrap();
        fs::write(temp.path().join("Sales/q3.pdf"), "pdf").unwrap();

        let root = resolver.resolve("").unwrap();
        for entry in lister.list(&root).unwrap() {
            let resolved = resolver.resolve(&entry.relative_path).unwrap();
            assert!(resolved.absolute().exists());
            assert_eq!(resolved.relative_str(), entry.relative_path);
        }
    }

    #[test]
    fn test_extension_without_dot_and_dotfiles() {
        let (temp, resolver, lister) = fixture();
        fs::write(temp.path().join("archive.tar.gz"), "").unwrap();
        fs::write(temp.path().join(".profile"), "").unwrap();

        let root = resolver.resolve("").unwrap();
        let entries = lister.list(&root).unwrap();

        let by_name = |n: &str| entries.iter().find(|e| e.name == n).unwrap().clone();
        assert_eq!(by_name("archive.tar.gz").extension, "gz");
        // Dotfiles are listed like any other entry.
        assert_eq!(by_name(".profile").extension, "");
    }

    #[test]
    fn test_breadcrumbs_root() {
        let crumbs = breadcrumbs("");
        assert_eq!(crumbs.len(), 1);
        assert_eq!(crumbs[0].name, "Home");
        assert_eq!(crumbs[0].relative_path, "");
        assert!(crumbs[0].is_active);
    }

    #[test]
    fn test_breadcrumbs_nested() {
        let crumbs = breadcrumbs("IT/Projects/2024");
        let parts: Vec<(&str, &str, bool)> = crumbs
            .iter()
            .map(|c| (c.name.as_str(), c.relative_path.as_str(), c.is_active))
            .collect();
        assert_eq!(
            parts,
            vec![
                ("Home", "", false),
                ("IT", "IT", false),
                ("Projects", "IT/Projects", false),
                ("2024", "IT/Projects/2024", true),
            ]
        );
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path(""), "");
        assert_eq!(parent_path("IT"), "");
        assert_eq!(parent_path("IT/Projects"), "IT");
        assert_eq!(parent_path("IT/Projects/2024"), "IT/Projects");
    }
}
