//! File manager module: path resolution, authorization, listing, and
//! file operations.
//!
//! This module is the core of DeptShare:
//! - Jailed path resolution with traversal rejection
//! - Department-scoped write authorization
//! - Deterministic directory listings with breadcrumbs
//! - Download, folder creation, batch upload, and recursive delete
//!
//! # Security
//!
//! Every caller-supplied path goes through [`PathResolver`] before any
//! filesystem access; resolution is stateless and re-validated per
//! request. Write operations additionally pass
//! [`DepartmentAuthorizer`], which only grants access inside the
//! caller's own department folder.

pub mod authorizer;
pub mod lister;
pub mod operations;
pub mod resolver;

pub use authorizer::{DepartmentAuthorizer, WriteDenied};
pub use lister::{breadcrumbs, parent_path, DirectoryLister, ListError};
pub use operations::{
    DeleteKind, Download, FileOperations, OpError, UploadFile, UploadOutcome,
};
pub use resolver::{PathResolver, ResolveError, ResolvedPath};
