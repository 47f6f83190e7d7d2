use std::path::{Path, PathBuf};

use crate::core::ToolError;

/// How path arguments are turned into filesystem paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPolicy {
    /// Keep only the final component and place it in the workspace root.
    /// This blocks `../` style traversal but nothing else (symlinks inside
    /// the root are still followed).
    BaseName,
    /// Relative paths resolve against the root, absolute paths are used as-is.
    Unrestricted,
}

/// Directory tool paths are resolved against.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    policy: PathPolicy,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, policy: PathPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> PathPolicy {
        self.policy
    }

    pub fn resolve(&self, raw: &str) -> Result<PathBuf, ToolError> {
        match self.policy {
            PathPolicy::BaseName => {
                let name = Path::new(raw.trim()).file_name().ok_or_else(|| {
                    ToolError::InvalidArgument(format!("'{raw}' does not name a file"))
                })?;
                Ok(self.root.join(name))
            }
            PathPolicy::Unrestricted => {
                let path = Path::new(raw);
                if path.is_absolute() {
                    Ok(path.to_path_buf())
                } else {
                    Ok(self.root.join(path))
                }
            }
        }
    }

    /// The name a resolved path is reported under in tool output.
    pub fn display(&self, raw: &str, resolved: &Path) -> String {
        match self.policy {
            PathPolicy::BaseName => resolved
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| raw.to_string()),
            PathPolicy::Unrestricted => raw.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_directories() {
        let ws = Workspace::new("/srv/work", PathPolicy::BaseName);
        assert_eq!(
            ws.resolve("../../etc/passwd").unwrap(),
            PathBuf::from("/srv/work/passwd")
        );
        assert_eq!(ws.resolve("notes.txt").unwrap(), PathBuf::from("/srv/work/notes.txt"));
        assert!(ws.resolve("..").is_err());
        assert!(ws.resolve("").is_err());
    }

    #[test]
    fn unrestricted_keeps_relative_structure() {
        let ws = Workspace::new("/srv/work", PathPolicy::Unrestricted);
        assert_eq!(ws.resolve("src/a.rs").unwrap(), PathBuf::from("/srv/work/src/a.rs"));
        assert_eq!(ws.resolve("/tmp/x").unwrap(), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn display_uses_base_name_under_base_name_policy() {
        let ws = Workspace::new("/srv/work", PathPolicy::BaseName);
        let resolved = ws.resolve("a/b/c.txt").unwrap();
        assert_eq!(ws.display("a/b/c.txt", &resolved), "c.txt");
    }
}
