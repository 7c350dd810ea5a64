//! # DeptShare Server Library
//!
//! This crate provides the DeptShare service: a department-scoped file
//! share over a single root directory.
//!
//! ## Overview
//!
//! Any authenticated user can browse and download everything under the
//! share root; uploads, folder creation, and deletion are only
//! permitted inside the caller's own department folder. The
//! security-critical piece is the path layer: every caller-supplied
//! path is resolved and containment-checked before any filesystem
//! access, on every request.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        HTTP Layer                           │
//! │        (axum routes, claims extraction, streaming)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     Operation Router                        │
//! │              resolve → authorize → operate                  │
//! ├──────────────┬──────────────┬──────────────┬────────────────┤
//! │ PathResolver │ Department   │ Directory    │ File           │
//! │ (jail)       │ Authorizer   │ Lister       │ Operations     │
//! └──────────────┴──────────────┴──────────────┴────────────────┘
//! ```
//!
//! Authentication is external: a fronting authenticator attaches
//! identity headers, and the [`session`] module turns them into typed
//! claims.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`session`]: Session claims and the authenticator seam
//! - [`files`]: Path resolution, authorization, listing, operations
//! - [`router`]: Operation dispatch and error mapping
//! - [`http`]: axum transport

pub mod config;
pub mod files;
pub mod http;
pub mod router;
pub mod session;

pub use config::Config;
