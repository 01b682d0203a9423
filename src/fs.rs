//! Filesystem access for the engine.
//!
//! Everything that needs to know whether a path exists, read a referenced
//! document, or write a placeholder goes through this module.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

const TRACING_TARGET: &str = "flowgraph::fs";

pub const NOT_FOUND_MESSAGE: &str = "Path does not exist";
pub const PERMISSION_DENIED_MESSAGE: &str = "Permission denied";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathType {
    File,
    Directory,
    NotFound,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathValidation {
    pub path: String,
    pub exists: bool,
    pub accessible: bool,
    #[serde(rename = "type")]
    pub path_type: PathType,
    pub permissions: Permissions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PathValidation {
    fn not_found(path: String) -> Self {
        PathValidation {
            path,
            exists: false,
            accessible: false,
            path_type: PathType::NotFound,
            permissions: Permissions::default(),
            error: Some(NOT_FOUND_MESSAGE.into()),
        }
    }

    fn denied(path: String, path_type: PathType) -> Self {
        PathValidation {
            path,
            exists: true,
            accessible: false,
            path_type,
            permissions: Permissions::default(),
            error: Some(PERMISSION_DENIED_MESSAGE.into()),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.exists && self.accessible
    }
}

/// Resolve `relative_path` against `base_path` (an absolute `relative_path`
/// is used as-is) and report existence, type and permissions.
///
/// Not-found and permission-denied are results; any other I/O failure is an
/// error.
pub async fn validate_path(
    base_path: &Path,
    relative_path: impl AsRef<Path>,
) -> Result<PathValidation, ResolveError> {
    inspect_path(&base_path.join(relative_path)).await
}

/// `validate_path` for a path that is already located.
pub async fn inspect_path(path: &Path) -> Result<PathValidation, ResolveError> {
    let shown = path.to_string_lossy().into_owned();

    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok(PathValidation::not_found(shown));
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            tracing::warn!(target: TRACING_TARGET, path = %shown, "Cannot stat path");
            return Ok(PathValidation::denied(shown, PathType::File));
        }
        Err(e) => return Err(ResolveError::io(path, e)),
    };

    let path_type = if metadata.is_dir() {
        PathType::Directory
    } else {
        PathType::File
    };

    let opened = if metadata.is_dir() {
        tokio::fs::read_dir(path).await.map(|_| ())
    } else {
        tokio::fs::File::open(path).await.map(|_| ())
    };
    match opened {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Ok(PathValidation::denied(shown, path_type));
        }
        Err(e) => return Err(ResolveError::io(path, e)),
    }

    Ok(PathValidation {
        path: shown,
        exists: true,
        accessible: true,
        path_type,
        permissions: permissions_of(&metadata),
        error: None,
    })
}

#[cfg(unix)]
fn permissions_of(metadata: &std::fs::Metadata) -> Permissions {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    Permissions {
        read: true,
        write: mode & 0o222 != 0 && !metadata.permissions().readonly(),
        execute: mode & 0o111 != 0,
    }
}

#[cfg(not(unix))]
fn permissions_of(metadata: &std::fs::Metadata) -> Permissions {
    Permissions {
        read: true,
        write: !metadata.permissions().readonly(),
        execute: metadata.is_dir(),
    }
}

/// Read a referenced document as text.
pub async fn read_document(path: &Path) -> Result<String, ResolveError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ResolveError::io(path, e))
}

/// What a placeholder should look like on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder<'a> {
    /// A minimal markdown document titled `name`.
    Document { name: &'a str, kind: &'a str },
    Directory,
}

/// Create a placeholder at `path`, including missing parent directories.
/// Existing files are left untouched.
pub async fn write_placeholder(
    path: &Path,
    placeholder: Placeholder<'_>,
) -> Result<(), ResolveError> {
    match placeholder {
        Placeholder::Directory => tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| ResolveError::io(path, e)),
        Placeholder::Document { name, kind } => {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ResolveError::io(parent, e))?;
            }
            if tokio::fs::try_exists(path)
                .await
                .map_err(|e| ResolveError::io(path, e))?
            {
                return Ok(());
            }
            tracing::info!(
                target: TRACING_TARGET,
                path = %path.display(),
                kind,
                "Writing placeholder"
            );
            tokio::fs::write(path, placeholder_document(name, kind))
                .await
                .map_err(|e| ResolveError::io(path, e))
        }
    }
}

fn placeholder_document(name: &str, kind: &str) -> String {
    format!(
        "---\nname: {name}\n\
         description: Placeholder {kind} created for a missing dependency\n\
         version: 0.0.0\n---\n\n# {name}\n\n\
         This {kind} is a placeholder. Replace it with a real definition.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate_path(dir.path(), "extensions/agents/foo.md").await.unwrap();
        assert!(!result.exists);
        assert!(!result.accessible);
        assert_eq!(result.path_type, PathType::NotFound);
        assert_eq!(result.error.as_deref(), Some("Path does not exist"));
    }

    #[tokio::test]
    async fn file_and_directory_are_classified() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/a.md"), "# a").unwrap();

        let file = validate_path(dir.path(), "sub/a.md").await.unwrap();
        assert_eq!(file.path_type, PathType::File);
        assert!(file.is_usable());
        assert!(file.permissions.read);

        let directory = validate_path(dir.path(), "sub").await.unwrap();
        assert_eq!(directory.path_type, PathType::Directory);
        assert!(directory.is_usable());
    }

    #[tokio::test]
    async fn placeholder_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extensions/agents/x.md");
        write_placeholder(&path, Placeholder::Document { name: "x", kind: "agent" })
            .await
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("---\nname: x\n"));
    }
}
