//! Session claims supplied by the external authenticator.
//!
//! DeptShare never authenticates users itself. A fronting collaborator
//! (reverse proxy, SSO gateway) verifies the caller and attaches
//! identity headers; this module turns those headers into a typed
//! [`SessionClaims`] value. The core consumes the claim and nothing
//! else: it never parses directory-service strings or reads ambient
//! global state.

use axum::http::HeaderMap;

/// Header carrying the authenticated username.
pub const USER_HEADER: &str = "x-deptshare-user";
/// Header carrying the caller's department.
pub const DEPARTMENT_HEADER: &str = "x-deptshare-department";
/// Header carrying the caller's role.
pub const ROLE_HEADER: &str = "x-deptshare-role";

/// Role asserted by the authenticator.
///
/// Carried for auditing; the authorization core never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Regular department member.
    Member,
    /// Administrative user.
    Admin,
}

/// Authenticated identity attached to every request.
#[derive(Debug, Clone)]
pub struct SessionClaims {
    /// Login name of the caller.
    pub username: String,
    /// Department the caller belongs to, if it matched the configured
    /// list. `None` means every write will be denied.
    pub department: Option<String>,
    /// Asserted role.
    pub role: Role,
}

/// Resolves a request's headers into session claims.
///
/// This is the seam to the external authentication collaborator;
/// alternative implementations can source claims from cookies, tokens,
/// or test fixtures.
pub trait ClaimsResolver: Send + Sync {
    /// Resolve claims, or `None` if the request is unauthenticated.
    fn resolve(&self, headers: &HeaderMap) -> Option<SessionClaims>;
}

/// Claims resolver reading identity headers set by a fronting proxy.
///
/// The department header is validated against the configured department
/// list; an unknown department resolves to `None` rather than failing
/// authentication, so such callers can still read.
pub struct HeaderClaimsResolver {
    departments: Vec<String>,
}

impl HeaderClaimsResolver {
    /// Create a resolver validating against the configured departments.
    pub fn new(departments: Vec<String>) -> Self {
        Self { departments }
    }

    fn canonical_department(&self, claimed: &str) -> Option<String> {
        let folded = claimed.to_lowercase();
        self.departments
            .iter()
            .find(|d| d.to_lowercase() == folded)
            .cloned()
    }
}

impl ClaimsResolver for HeaderClaimsResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<SessionClaims> {
        let username = headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|u| !u.is_empty())?
            .to_string();

        let department = headers
            .get(DEPARTMENT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .and_then(|d| self.canonical_department(d));

        let role = match headers
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
        {
            Some(r) if r.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::Member,
        };

        Some(SessionClaims {
            username,
            department,
            role,
        })
    }
}
