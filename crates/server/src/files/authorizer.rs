//! Department write authorization.
//!
//! Write operations (upload, create, delete) are only permitted inside
//! the caller's own department subtree. The department folders are the
//! top-level children of the share root whose names appear in the
//! configured department list; everything else at the top level is
//! read-only for everyone.

use std::path::Path;

use thiserror::Error;

/// Why a write was denied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WriteDenied {
    /// Writes at the root level are never permitted.
    #[error("writes are not permitted at the share root")]
    RootTarget,

    /// The top-level folder is not a configured department.
    #[error("{0:?} is not a department folder")]
    NotADepartment(String),

    /// The caller's session carries no department claim.
    #[error("your session has no department")]
    NoDepartment,

    /// The caller belongs to a different department.
    #[error("department {caller:?} cannot write into {target:?}")]
    DepartmentMismatch {
        /// Department of the write target.
        target: String,
        /// Department of the caller.
        caller: String,
    },
}

/// Decides whether a write into a given relative path is permitted for
/// a caller's department claim.
///
/// Matching is case-insensitive in both directions: the target's first
/// segment against the configured list, and the caller's claim against
/// the target. There is no hierarchy and no role-based bypass.
pub struct DepartmentAuthorizer {
    departments: Vec<String>,
}

impl DepartmentAuthorizer {
    /// Create an authorizer for the configured department names.
    pub fn new(departments: Vec<String>) -> Self {
        Self { departments }
    }

    /// The configured department names.
    pub fn departments(&self) -> &[String] {
        &self.departments
    }

    /// Look up the configured department matching `name`
    /// case-insensitively.
    pub fn find_department(&self, name: &str) -> Option<&str> {
        let folded = name.to_lowercase();
        self.departments
            .iter()
            .find(|d| d.to_lowercase() == folded)
            .map(|d| d.as_str())
    }

    /// Check whether a write into `relative` is permitted for a caller
    /// with department `caller`.
    ///
    /// The first segment of `relative` is the target department; the
    /// write is permitted iff it is a configured department and equals
    /// the caller's claim.
    pub fn check_write(
        &self,
        relative: &Path,
        caller: Option<&str>,
    ) -> Result<(), WriteDenied> {
        let first = match relative.components().next() {
            Some(c) => c.as_os_str().to_string_lossy().into_owned(),
            None => return Err(WriteDenied::RootTarget),
        };

        let target = self
            .find_department(&first)
            .ok_or_else(|| WriteDenied::NotADepartment(first.clone()))?;

        let caller = caller.ok_or(WriteDenied::NoDepartment)?;
        if caller.to_lowercase() == target.to_lowercase() {
            Ok(())
        } else {
            Err(WriteDenied::DepartmentMismatch {
                target: target.to_string(),
                caller: caller.to_string(),
            })
        }
    }

    /// Convenience form of [`check_write`](Self::check_write).
    pub fn can_write(&self, relative: &Path, caller: Option<&str>) -> bool {
        self.check_write(relative, caller).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn authorizer() -> DepartmentAuthorizer {
        DepartmentAuthorizer::new(vec![
            "IT".to_string(),
            "Sales".to_string(),
            "HR".to_string(),
        ])
    }

    #[test]
    fn test_own_department_is_writable() {
        let auth = authorizer();
        assert!(auth.can_write(&PathBuf::from("IT"), Some("IT")));
        assert!(auth.can_write(&PathBuf::from("IT/Projects/2024"), Some("IT")));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let auth = authorizer();
        assert!(auth.can_write(&PathBuf::from("it/Projects"), Some("IT")));
        assert!(auth.can_write(&PathBuf::from("IT/Projects"), Some("it")));
        assert!(auth.can_write(&PathBuf::from("SALES"), Some("sales")));
    }

    #[test]
    fn test_other_department_is_denied() {
        let auth = authorizer();
        assert_eq!(
            auth.check_write(&PathBuf::from("Sales/Projects"), Some("IT")),
            Err(WriteDenied::DepartmentMismatch {
                target: "Sales".to_string(),
                caller: "IT".to_string(),
            })
        );
    }

    #[test]
    fn test_root_is_never_writable() {
        let auth = authorizer();
        assert_eq!(
            auth.check_write(&PathBuf::new(), Some("IT")),
            Err(WriteDenied::RootTarget)
        );
    }

    #[test]
    fn test_unconfigured_top_level_folder_is_denied() {
        let auth = authorizer();
        // A junk folder at the top level is not writable by anyone,
        // whatever their department.
        assert_eq!(
            auth.check_write(&PathBuf::from("temp-stuff/x"), Some("IT")),
            Err(WriteDenied::NotADepartment("temp-stuff".to_string()))
        );
        assert_eq!(
            auth.check_write(&PathBuf::from("temp-stuff/x"), Some("temp-stuff")),
            Err(WriteDenied::NotADepartment("temp-stuff".to_string()))
        );
    }

    #[test]
    fn test_missing_claim_is_denied() {
        let auth = authorizer();
        assert_eq!(
            auth.check_write(&PathBuf::from("IT/Projects"), None),
            Err(WriteDenied::NoDepartment)
        );
    }

    #[test]
    fn test_department_gate_truth_table() {
        let auth = authorizer();
        let depts = ["IT", "Sales", "HR"];
        for target in depts {
            let path = PathBuf::from(format!("{target}/docs"));
            for caller in depts {
                assert_eq!(
                    auth.can_write(&path, Some(caller)),
                    caller == target,
                    "target {target}, caller {caller}"
                );
            }
        }
    }

    #[test]
    fn test_find_department_returns_configured_spelling() {
        let auth = authorizer();
        assert_eq!(auth.find_department("sales"), Some("Sales"));
        assert_eq!(auth.find_department("Legal"), None);
    }
}
