//! Error taxonomy for the DeptShare API.
//!
//! Every failed request carries a stable machine-readable [`ErrorCode`]
//! plus a human-readable message. Clients branch on the code; the
//! message is surfaced to the user verbatim.

use serde::{Deserialize, Serialize};

/// Machine-distinguishable failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The supplied path would resolve outside the share root.
    PathEscape,
    /// The caller's department does not permit this write.
    Forbidden,
    /// No file or folder exists at the resolved path.
    NotFound,
    /// A folder with the requested name already exists.
    AlreadyExists,
    /// Empty name, invalid characters, or an attempt to delete the root.
    InvalidArgument,
    /// Underlying filesystem failure.
    Io,
    /// The request carried no authenticated session.
    Unauthenticated,
}

/// JSON body returned for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable failure kind.
    pub code: ErrorCode,
    /// Human-readable explanation, safe to show in the UI.
    pub message: String,
}

impl ErrorBody {
    /// Create an error body.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}
