//! Virtual paths and their mapping onto the configured root directory

use crate::error::ContentError;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const SEPARATORS: &[char] = &['/', '\\'];
#[cfg(not(windows))]
const SEPARATORS: &[char] = &['/'];

/// A client-facing path rooted at `/`.
///
/// Construction rejects `..` segments and NUL bytes, so a resolved path can
/// never climb above the configured root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualPath(String);

impl VirtualPath {
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Validate a decoded path, adding the leading `/` when missing
    pub fn parse(raw: &str) -> Result<Self, ContentError> {
        if raw.contains('\0') {
            return Err(ContentError::InvalidPath(
                "path contains a NUL byte".to_string(),
            ));
        }
        if raw.split(SEPARATORS).any(|segment| segment == "..") {
            return Err(ContentError::InvalidPath(format!(
                "'{}' escapes the root directory",
                raw
            )));
        }

        if raw.starts_with('/') {
            Ok(Self(raw.to_string()))
        } else {
            Ok(Self(format!("/{}", raw)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.trim_end_matches('/').is_empty()
    }

    /// Last non-empty segment; empty for the root
    pub fn name(&self) -> &str {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    /// Same path ending in `/`
    pub fn with_trailing_slash(&self) -> Self {
        if self.0.ends_with('/') {
            self.clone()
        } else {
            Self(format!("{}/", self.0))
        }
    }

    /// Enclosing directory; the root is its own parent
    pub fn parent(&self) -> Self {
        let trimmed = self.0.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(0) | None => Self::root(),
            Some(idx) => Self(trimmed[..idx].to_string()),
        }
    }

    /// Append a single child name
    pub fn join(&self, name: &str) -> Result<Self, ContentError> {
        validate_name(name)?;
        if self.0.ends_with('/') {
            Ok(Self(format!("{}{}", self.0, name)))
        } else {
            Ok(Self(format!("{}/{}", self.0, name)))
        }
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VirtualPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check that `name` is exactly one path segment
pub fn validate_name(name: &str) -> Result<(), ContentError> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(ContentError::InvalidPath(format!(
            "'{}' is not a valid entry name",
            name
        )));
    }
    if name.contains(SEPARATORS) || name.contains('\0') {
        return Err(ContentError::InvalidPath(format!(
            "entry name '{}' must not contain separators",
            name
        )));
    }
    Ok(())
}

/// Maps virtual paths to absolute filesystem paths by prefixing the root
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Plain string join of root and virtual path; no existence check
    pub fn resolve(&self, path: &VirtualPath) -> PathBuf {
        let root = self.root.as_os_str().to_string_lossy();
        let mut full = OsString::from(root.trim_end_matches('/'));
        full.push(path.as_str());
        PathBuf::from(full)
    }
}
