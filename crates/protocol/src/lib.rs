//! # DeptShare Protocol Library
//!
//! Wire types shared between the DeptShare server and its clients.
//!
//! ## Overview
//!
//! This crate defines the JSON bodies exchanged over the HTTP API:
//!
//! - **Directory listings**: entries, breadcrumb trails, parent paths
//! - **Operation bodies**: upload reports, folder creation, deletion
//! - **Error taxonomy**: stable machine-readable error codes with
//!   human-readable messages
//!
//! It deliberately contains no filesystem or transport logic so that
//! clients can depend on it without pulling in the server stack.
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::messages::{Entry, EntryKind};
//!
//! let entry = Entry {
//!     name: "report.docx".to_string(),
//!     kind: EntryKind::File,
//!     size_bytes: 4096,
//!     modified_at: 1704067200,
//!     extension: "docx".to_string(),
//!     relative_path: "IT/Projects/report.docx".to_string(),
//! };
//!
//! let json = serde_json::to_string(&entry).unwrap();
//! assert!(json.contains("\"kind\":\"file\""));
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: request and response bodies
//! - [`error`]: error codes and the error response envelope

pub mod error;
pub mod messages;

pub use error::{ErrorBody, ErrorCode};
pub use messages::{
    Breadcrumb, CreateFolderRequest, CreateFolderResponse, DeleteRequest, DeleteResponse, Entry,
    EntryKind, ListResponse, UploadFailure, UploadReport,
};
