//! Operation router: the resolve → authorize → operate pipeline.
//!
//! Every API operation flows through here. The router resolves the
//! caller-supplied path, applies the department gate for mutating
//! operations, invokes the file operation, and maps component errors to
//! the wire taxonomy. Path escapes and denied writes are logged as
//! security-relevant events.

use std::sync::Arc;

use protocol::error::{ErrorBody, ErrorCode};
use protocol::messages::{
    CreateFolderResponse, DeleteResponse, ListResponse, UploadFailure, UploadReport,
};
use tracing::{debug, info, warn};

use crate::files::{
    breadcrumbs, parent_path, DepartmentAuthorizer, DirectoryLister, Download, FileOperations,
    ListError, OpError, PathResolver, ResolveError, ResolvedPath, UploadFile, WriteDenied,
};
use crate::session::SessionClaims;

/// Errors surfaced by the router, one variant per upstream component.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Path resolution failure.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Department gate denial.
    #[error(transparent)]
    Denied(#[from] WriteDenied),

    /// Listing failure.
    #[error(transparent)]
    List(#[from] ListError),

    /// File operation failure.
    #[error(transparent)]
    Op(#[from] OpError),
}

impl RouterError {
    /// Map to the stable wire error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            RouterError::Resolve(ResolveError::Escape(_)) => ErrorCode::PathEscape,
            RouterError::Resolve(ResolveError::InvalidEncoding(_)) => ErrorCode::InvalidArgument,
            RouterError::Denied(_) => ErrorCode::Forbidden,
            RouterError::List(ListError::NotFound(_))
            | RouterError::List(ListError::NotADirectory(_)) => ErrorCode::NotFound,
            RouterError::List(ListError::Io(_)) => ErrorCode::Io,
            RouterError::Op(OpError::NotFound(_)) => ErrorCode::NotFound,
            RouterError::Op(OpError::AlreadyExists(_)) => ErrorCode::AlreadyExists,
            RouterError::Op(OpError::EmptyName)
            | RouterError::Op(OpError::InvalidName(_))
            | RouterError::Op(OpError::RootDeletion)
            | RouterError::Op(OpError::TooLarge { .. }) => ErrorCode::InvalidArgument,
            RouterError::Op(OpError::Io(_)) => ErrorCode::Io,
        }
    }

    /// Convert to the wire error body.
    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody::new(self.code(), self.to_string())
    }
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

/// Dispatches API operations to the file components.
///
/// Reads (list, download) only require an authenticated session; writes
/// (upload, create folder, delete) additionally pass the department
/// authorizer before any filesystem mutation is attempted.
pub struct OperationRouter {
    /// Path resolver jailed to the share root.
    resolver: Arc<PathResolver>,
    /// Department write gate.
    authorizer: Arc<DepartmentAuthorizer>,
    /// Directory lister.
    lister: Arc<DirectoryLister>,
    /// File operations handler.
    operations: Arc<FileOperations>,
}

impl OperationRouter {
    /// Create a new router with the given components.
    pub fn new(
        resolver: Arc<PathResolver>,
        authorizer: Arc<DepartmentAuthorizer>,
        lister: Arc<DirectoryLister>,
        operations: Arc<FileOperations>,
    ) -> Self {
        Self {
            resolver,
            authorizer,
            lister,
            operations,
        }
    }

    /// List a directory: entries, breadcrumbs, and the parent path.
    pub fn list(&self, claims: &SessionClaims, raw_path: &str) -> RouterResult<ListResponse> {
        let resolved = self.resolve(claims, raw_path)?;
        debug!(user = %claims.username, path = %resolved.relative_str(), "Listing directory");

        let entries = self.lister.list(&resolved)?;
        let relative = resolved.relative_str();

        Ok(ListResponse {
            parent_path: parent_path(&relative),
            breadcrumbs: breadcrumbs(&relative),
            path: relative,
            entries,
        })
    }

    /// Open a file for download.
    pub fn download(&self, claims: &SessionClaims, raw_path: &str) -> RouterResult<Download> {
        let resolved = self.resolve(claims, raw_path)?;
        debug!(user = %claims.username, path = %resolved.relative_str(), "Downloading file");

        Ok(self.operations.open_download(&resolved)?)
    }

    /// Store a batch of uploaded files under the target directory.
    pub fn upload(
        &self,
        claims: &SessionClaims,
        raw_path: &str,
        files: Vec<UploadFile>,
    ) -> RouterResult<UploadReport> {
        let resolved = self.resolve(claims, raw_path)?;
        self.authorize_write(claims, &resolved)?;

        let outcome = self.operations.upload(&resolved, files)?;
        info!(
            user = %claims.username,
            path = %resolved.relative_str(),
            uploaded = outcome.uploaded.len(),
            failed = outcome.failed.len(),
            "Upload batch finished"
        );

        Ok(UploadReport::summarize(
            outcome.uploaded,
            outcome.created_folders,
            outcome
                .failed
                .into_iter()
                .map(|(name, e)| UploadFailure {
                    name,
                    reason: e.to_string(),
                })
                .collect(),
        ))
    }

    /// Create a folder under the target directory.
    pub fn create_folder(
        &self,
        claims: &SessionClaims,
        raw_path: &str,
        folder_name: &str,
    ) -> RouterResult<CreateFolderResponse> {
        let resolved = self.resolve(claims, raw_path)?;
        self.authorize_write(claims, &resolved)?;

        let relative_path = self.operations.create_folder(&resolved, folder_name)?;
        let name = relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&relative_path)
            .to_string();
        info!(user = %claims.username, path = %relative_path, "Folder created");

        Ok(CreateFolderResponse {
            relative_path,
            message: format!("Folder '{name}' created successfully."),
        })
    }

    /// Delete a file or folder.
    pub fn delete(&self, claims: &SessionClaims, raw_path: &str) -> RouterResult<DeleteResponse> {
        let resolved = self.resolve(claims, raw_path)?;
        // Deleting the root is invalid regardless of who asks; report
        // it as such rather than as a department denial.
        if resolved.is_root() {
            return Err(OpError::RootDeletion.into());
        }
        self.authorize_write(claims, &resolved)?;

        let kind = self.operations.delete(&resolved)?;
        info!(user = %claims.username, path = %resolved.relative_str(), ?kind, "Deleted");

        Ok(DeleteResponse {
            message: match kind {
                crate::files::DeleteKind::File => "File deleted successfully.".to_string(),
                crate::files::DeleteKind::Folder => "Folder deleted successfully.".to_string(),
            },
        })
    }

    /// Resolve a caller-supplied path, logging escape attempts.
    fn resolve(&self, claims: &SessionClaims, raw_path: &str) -> RouterResult<ResolvedPath> {
        self.resolver.resolve(raw_path).map_err(|e| {
            if matches!(e, ResolveError::Escape(_)) {
                warn!(
                    user = %claims.username,
                    input = %raw_path,
                    "Rejected path escaping the share root"
                );
            }
            RouterError::from(e)
        })
    }

    /// Apply the department gate, logging denials.
    fn authorize_write(
        &self,
        claims: &SessionClaims,
        resolved: &ResolvedPath,
    ) -> RouterResult<()> {
        self.authorizer
            .check_write(resolved.relative(), claims.department.as_deref())
            .map_err(|e| {
                warn!(
                    user = %claims.username,
                    department = claims.department.as_deref().unwrap_or("<none>"),
                    target = %resolved.relative_str(),
                    reason = %e,
                    "Write denied"
                );
                RouterError::from(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use bytes::Bytes;
    use std::fs;
    use tempfile::TempDir;

    fn claims(user: &str, department: Option<&str>) -> SessionClaims {
        SessionClaims {
            username: user.to_string(),
            department: department.map(str::to_string),
            role: Role::Member,
        }
    }

    fn fixture() -> (TempDir, OperationRouter) {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("IT")).unwrap();
        fs::create_dir(temp.path().join("Sales")).unwrap();

        let resolver = Arc::new(PathResolver::new(temp.path()).unwrap());
        let authorizer = Arc::new(DepartmentAuthorizer::new(vec![
            "IT".to_string(),
            "Sales".to_string(),
        ]));
        let lister = Arc::new(DirectoryLister::new(resolver.clone()));
        let operations = Arc::new(
            FileOperations::new(10 * 1024 * 1024)
                .with_staging_dir(temp.path().join(".staging")),
        );

        let router = OperationRouter::new(resolver, authorizer, lister, operations);
        (temp, router)
    }

    #[test]
    fn test_list_root() {
        let (_temp, router) = fixture();
        let response = router.list(&claims("alice", Some("IT")), "").unwrap();

        assert_eq!(response.path, "");
        assert_eq!(response.parent_path, "");
        let names: Vec<&str> = response.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["IT", "Sales"]);
        assert_eq!(response.breadcrumbs.len(), 1);
    }

    #[test]
    fn test_list_is_open_to_other_departments() {
        let (temp, router) = fixture();
        fs::write(temp.path().join("IT/plan.md"), "x").unwrap();

        // Reads never consult the department gate.
        let response = router.list(&claims("carol", Some("Sales")), "IT").unwrap();
        assert_eq!(response.entries.len(), 1);
        assert_eq!(response.parent_path, "");
        assert_eq!(response.breadcrumbs.last().unwrap().name, "IT");
    }

    #[test]
    fn test_download_is_open_to_any_department() {
        let (temp, router) = fixture();
        fs::write(temp.path().join("IT/tool.zip"), "zip").unwrap();

        let download = router
            .download(&claims("carol", Some("Sales")), "IT/tool.zip")
            .unwrap();
        assert_eq!(download.name, "tool.zip");
        assert_eq!(download.size, 3);
    }

    #[test]
    fn test_create_folder_scenario() {
        let (temp, router) = fixture();
        fs::create_dir(temp.path().join("IT/Projects")).unwrap();
        fs::create_dir(temp.path().join("Sales/Projects")).unwrap();
        let it = claims("alice", Some("IT"));

        // Own department: allowed.
        let created = router.create_folder(&it, "IT/Projects", "2024").unwrap();
        assert_eq!(created.relative_path, "IT/Projects/2024");
        assert!(temp.path().join("IT/Projects/2024").is_dir());

        // Someone else's department: Forbidden.
        let denied = router.create_folder(&it, "Sales/Projects", "2024");
        assert!(matches!(
            denied,
            Err(ref e) if e.code() == ErrorCode::Forbidden
        ));
        assert!(!temp.path().join("Sales/Projects/2024").exists());
    }

    #[test]
    fn test_escape_is_path_escape() {
        let (_temp, router) = fixture();
        let result = router.list(&claims("mallory", Some("IT")), "IT/../../etc/passwd");
        assert!(matches!(
            result,
            Err(ref e) if e.code() == ErrorCode::PathEscape
        ));
    }

    #[test]
    fn test_upload_requires_department_match() {
        let (temp, router) = fixture();
        let files = vec![UploadFile {
            name: "memo.txt".to_string(),
            data: Bytes::from_static(b"memo"),
        }];

        let denied = router.upload(&claims("carol", Some("Sales")), "IT", files.clone());
        assert!(matches!(
            denied,
            Err(ref e) if e.code() == ErrorCode::Forbidden
        ));

        let report = router
            .upload(&claims("alice", Some("IT")), "IT", files)
            .unwrap();
        assert_eq!(report.uploaded, vec!["memo.txt"]);
        assert!(temp.path().join("IT/memo.txt").exists());
    }

    #[test]
    fn test_upload_to_root_is_forbidden() {
        let (_temp, router) = fixture();
        let result = router.upload(
            &claims("alice", Some("IT")),
            "",
            vec![UploadFile {
                name: "loose.txt".to_string(),
                data: Bytes::from_static(b"x"),
            }],
        );
        assert!(matches!(
            result,
            Err(ref e) if e.code() == ErrorCode::Forbidden
        ));
    }

    #[test]
    fn test_upload_without_department_claim() {
        let (_temp, router) = fixture();
        let result = router.upload(
            &claims("guest", None),
            "IT",
            vec![UploadFile {
                name: "x.txt".to_string(),
                data: Bytes::from_static(b"x"),
            }],
        );
        assert!(matches!(
            result,
            Err(ref e) if e.code() == ErrorCode::Forbidden
        ));
    }

    #[test]
    fn test_delete_scenarios() {
        let (temp, router) = fixture();
        fs::write(temp.path().join("IT/old.txt"), "x").unwrap();
        let it = claims("alice", Some("IT"));

        // Root deletion is always refused, before the department gate
        // can even apply.
        let root = router.delete(&it, "");
        assert!(matches!(
            root,
            Err(ref e) if e.code() == ErrorCode::InvalidArgument
        ));

        // Cross-department delete is Forbidden.
        let cross = router.delete(&claims("carol", Some("Sales")), "IT/old.txt");
        assert!(matches!(
            cross,
            Err(ref e) if e.code() == ErrorCode::Forbidden
        ));

        // Own file deletes fine.
        let ok = router.delete(&it, "IT/old.txt").unwrap();
        assert_eq!(ok.message, "File deleted successfully.");
        assert!(!temp.path().join("IT/old.txt").exists());

        // Gone now.
        let missing = router.delete(&it, "IT/old.txt");
        assert!(matches!(
            missing,
            Err(ref e) if e.code() == ErrorCode::NotFound
        ));
    }

    #[test]
    fn test_create_folder_duplicate_is_already_exists() {
        let (_temp, router) = fixture();
        let it = claims("alice", Some("IT"));

        router.create_folder(&it, "IT", "Projects").unwrap();
        let dup = router.create_folder(&it, "IT", "Projects");
        assert!(matches!(
            dup,
            Err(ref e) if e.code() == ErrorCode::AlreadyExists
        ));
    }

    #[test]
    fn test_error_body_carries_specific_reason() {
        let (_temp, router) = fixture();
        let err = router
            .create_folder(&claims("carol", Some("Sales")), "IT", "2024")
            .unwrap_err();
        let body = err.to_error_body();
        assert_eq!(body.code, ErrorCode::Forbidden);
        assert!(body.message.contains("Sales"));
        assert!(body.message.contains("IT"));
    }
}
