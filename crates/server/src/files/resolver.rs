//! Jailed path resolution.
//!
//! This module translates untrusted, URL-supplied relative paths into
//! validated absolute paths strictly inside the configured share root.
//! Resolution is stateless and happens fresh on every call; nothing is
//! cached or trusted from a prior request.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Characters that are never allowed in a user-supplied file or folder
/// name (separators plus the usual filesystem-reserved set).
pub const RESERVED_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Errors that can occur while resolving a caller-supplied path.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The path would resolve outside the share root.
    #[error("path escapes the share root: {0:?}")]
    Escape(String),

    /// The path is not valid percent-encoded UTF-8.
    #[error("path is not valid percent-encoded UTF-8: {0:?}")]
    InvalidEncoding(String),
}

/// A path that has passed resolution: inside the root, no `..`, no
/// control characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    relative: PathBuf,
}

impl ResolvedPath {
    /// Absolute filesystem path, guaranteed inside the root.
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// Path relative to the root; empty for the root itself.
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// True if this is the share root.
    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }

    /// Relative path in wire form: forward-slash separated, empty for
    /// the root.
    pub fn relative_str(&self) -> String {
        path_to_wire(&self.relative)
    }

    /// First segment of the relative path, if any.
    pub fn first_segment(&self) -> Option<&str> {
        self.relative
            .components()
            .next()
            .and_then(|c| c.as_os_str().to_str())
    }
}

/// Convert a relative path to its forward-slash wire form.
pub fn path_to_wire(path: &Path) -> String {
    path.components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/")
}

/// Remove ASCII control characters (0x00-0x1F, 0x7F) from a
/// user-supplied string. Guards against header/log injection and names
/// no filesystem accepts.
pub fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_ascii_control())
        .collect()
}

/// Canonicalizes caller-supplied relative paths into absolute paths
/// strictly inside a fixed root.
///
/// Normalization is lexical (`.` and `..` are resolved without touching
/// the filesystem) so that paths which do not exist yet can still be
/// validated before a create or upload.
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver jailed to `root`.
    ///
    /// The root is canonicalized once here; it must exist. All resolved
    /// paths are validated against this canonical form on every call.
    pub fn new(root: &Path) -> std::io::Result<Self> {
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    /// The canonical share root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an untrusted relative path against the root.
    ///
    /// Empty input (the root sentinel) resolves to the root itself.
    /// The input is percent-decoded exactly once, control characters
    /// are stripped, and both separator styles are accepted. Absolute
    /// inputs and any input that would climb out of the root fail with
    /// [`ResolveError::Escape`].
    pub fn resolve(&self, raw: &str) -> Result<ResolvedPath, ResolveError> {
        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| ResolveError::InvalidEncoding(raw.to_string()))?;
        let cleaned = strip_control_chars(&decoded);

        if cleaned.is_empty() {
            return Ok(ResolvedPath {
                absolute: self.root.clone(),
                relative: PathBuf::new(),
            });
        }

        // Absolute inputs replace the join base entirely, so they are
        // rejected outright rather than silently re-rooted.
        if cleaned.starts_with('/') || cleaned.starts_with('\\') || has_drive_prefix(&cleaned) {
            return Err(ResolveError::Escape(raw.to_string()));
        }

        let normalized = cleaned.replace('\\', "/");
        let mut segments: Vec<&str> = Vec::new();
        for segment in normalized.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    // Climbing above the root is the escape this whole
                    // module exists to stop.
                    if segments.pop().is_none() {
                        return Err(ResolveError::Escape(raw.to_string()));
                    }
                }
                _ => segments.push(segment),
            }
        }

        if segments.is_empty() {
            return Ok(ResolvedPath {
                absolute: self.root.clone(),
                relative: PathBuf::new(),
            });
        }

        let relative: PathBuf = segments.iter().collect();
        let absolute = self.root.join(&relative);

        // Containment is re-verified on every call even though the
        // construction above cannot produce an outside path.
        if !absolute.starts_with(&self.root) || relative.components().any(is_non_normal) {
            return Err(ResolveError::Escape(raw.to_string()));
        }

        Ok(ResolvedPath { absolute, relative })
    }

    /// Produce the wire-form relative path for an absolute path under
    /// the root. Returns `None` if the path is not inside the root.
    pub fn relativize(&self, absolute: &Path) -> Option<String> {
        absolute
            .strip_prefix(&self.root)
            .ok()
            .map(path_to_wire)
    }
}

fn is_non_normal(component: Component<'_>) -> bool {
    !matches!(component, Component::Normal(_))
}

/// Windows drive prefixes (`C:...`) count as absolute input.
pub(crate) fn has_drive_prefix(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn resolver(temp: &TempDir) -> PathResolver {
        PathResolver::new(temp.path()).unwrap()
    }

    #[test]
    fn test_empty_input_is_root() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        let resolved = r.resolve("").unwrap();
        assert!(resolved.is_root());
        assert_eq!(resolved.absolute(), r.root());
        assert_eq!(resolved.relative_str(), "");
    }

    #[test]
    fn test_dot_and_empty_segments_are_root() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        for input in [".", "./", "././.", "///"] {
            let resolved = r.resolve(input).unwrap();
            assert!(resolved.is_root(), "input {:?} should resolve to root", input);
        }
    }

    #[test]
    fn test_simple_resolution() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        let resolved = r.resolve("IT/Projects/plan.md").unwrap();
        assert_eq!(resolved.absolute(), r.root().join("IT/Projects/plan.md"));
        assert_eq!(resolved.relative_str(), "IT/Projects/plan.md");
        assert_eq!(resolved.first_segment(), Some("IT"));
    }

    #[test]
    fn test_backslash_separators_are_normalized() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        let resolved = r.resolve("IT\\Projects\\plan.md").unwrap();
        assert_eq!(resolved.relative_str(), "IT/Projects/plan.md");
    }

    #[test]
    fn test_percent_decoding_happens_once() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        let resolved = r.resolve("IT/Annual%20Report.docx").unwrap();
        assert_eq!(resolved.relative_str(), "IT/Annual Report.docx");

        // A double-encoded ".." decodes to a literal "%2e%2e" segment,
        // not a traversal.
        let resolved = r.resolve("IT/%252e%252e/x").unwrap();
        assert_eq!(resolved.relative_str(), "IT/%2e%2e/x");
    }

    #[test]
    fn test_encoded_traversal_is_rejected() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        let result = r.resolve("%2e%2e/%2e%2e/etc/passwd");
        assert!(matches!(result, Err(ResolveError::Escape(_))));
    }

    #[test]
    fn test_escape_via_parent_segments() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        for input in [
            "..",
            "../",
            "../../etc/passwd",
            "IT/../../etc/passwd",
            "IT/../../../root",
            "..\\..\\windows",
        ] {
            let result = r.resolve(input);
            assert!(
                matches!(result, Err(ResolveError::Escape(_))),
                "input {:?} must fail with Escape",
                input
            );
        }
    }

    #[test]
    fn test_interior_parent_segments_resolve_lexically() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        // Never leaves the root, so it is allowed.
        let resolved = r.resolve("IT/Projects/../Archive").unwrap();
        assert_eq!(resolved.relative_str(), "IT/Archive");
    }

    #[test]
    fn test_parent_segments_back_to_root_are_root() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        let resolved = r.resolve("IT/..").unwrap();
        assert!(resolved.is_root());
    }

    #[test]
    fn test_absolute_inputs_are_rejected() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        for input in ["/etc/passwd", "\\\\server\\share", "C:/Windows", "c:\\temp"] {
            let result = r.resolve(input);
            assert!(
                matches!(result, Err(ResolveError::Escape(_))),
                "input {:?} must fail with Escape",
                input
            );
        }
    }

    #[test]
    fn test_sibling_prefix_cannot_pass_as_root() {
        // A sibling of the root whose name shares a string prefix
        // ("share" vs "share-other") must not slip through containment.
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("share");
        fs::create_dir(&root).unwrap();
        fs::create_dir(parent.path().join("share-other")).unwrap();

        let r = PathResolver::new(&root).unwrap();
        let result = r.resolve("../share-other/secret.txt");
        assert!(matches!(result, Err(ResolveError::Escape(_))));
    }

    #[test]
    fn test_control_characters_are_stripped() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        let resolved = r.resolve("IT/re\u{0}po\u{1f}rt.txt").unwrap();
        assert_eq!(resolved.relative_str(), "IT/report.txt");
    }

    #[test]
    fn test_invalid_percent_encoding() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        // %ff%fe is not valid UTF-8 after decoding
        let result = r.resolve("IT/%ff%fe");
        assert!(matches!(result, Err(ResolveError::InvalidEncoding(_))));
    }

    #[test]
    fn test_relativize_roundtrip() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        let resolved = r.resolve("Sales/Q3/report.pdf").unwrap();
        assert_eq!(
            r.relativize(resolved.absolute()).as_deref(),
            Some("Sales/Q3/report.pdf")
        );
        assert_eq!(r.relativize(Path::new("/elsewhere")), None);
    }

    #[test]
    fn test_resolution_is_stateless() {
        let temp = TempDir::new().unwrap();
        let r = resolver(&temp);

        // A rejected path stays rejected and a good path stays good,
        // in any order.
        assert!(r.resolve("../escape").is_err());
        assert!(r.resolve("IT/ok.txt").is_ok());
        assert!(r.resolve("../escape").is_err());
    }

    #[test]
    fn test_strip_control_chars() {
        assert_eq!(strip_control_chars("a\u{0}b\tc\u{7f}d"), "abcd");
        assert_eq!(strip_control_chars("clean"), "clean");
    }
}
