use crate::error::{Result, UpgraderError};
use std::path::{Path, PathBuf};

/// Path checks applied before any file is rewritten.
pub struct PathValidator;

impl PathValidator {
    /// Canonicalises the requirements path and ensures it is a regular file
    /// outside of system directories.
    pub fn validate_manifest_path(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(UpgraderError::Configuration(format!(
                "Requirements file not found: {}",
                path.display()
            )));
        }

        let canonical = path.canonicalize().map_err(|e| {
            UpgraderError::Configuration(format!("Invalid path '{}': {e}", path.display()))
        })?;

        if !canonical.is_file() {
            return Err(UpgraderError::Configuration(format!(
                "Requirements path '{}' is not a file",
                canonical.display()
            )));
        }

        const FORBIDDEN: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

        for forbidden in FORBIDDEN {
            let forbidden_path = Path::new(forbidden);
            let inside = canonical.starts_with(forbidden_path)
                || forbidden_path
                    .canonicalize()
                    .is_ok_and(|resolved| canonical.starts_with(resolved));

            if inside {
                return Err(UpgraderError::Configuration(format!(
                    "Refusing to modify files under system directory '{}'",
                    forbidden
                )));
            }
        }

        Ok(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn accepts_regular_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("requirements.txt");
        fs::write(&file, "flask==2.0.1\n").unwrap();
        let resolved = PathValidator::validate_manifest_path(&file).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("requirements.txt"));
    }

    #[test]
    fn rejects_missing_file() {
        let dir = tempdir().unwrap();
        let err = PathValidator::validate_manifest_path(dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, UpgraderError::Configuration(msg) if msg.contains("not found")));
    }

    #[test]
    fn rejects_directory() {
        let dir = tempdir().unwrap();
        let err = PathValidator::validate_manifest_path(dir.path()).unwrap_err();
        assert!(matches!(err, UpgraderError::Configuration(_)));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_system_directory() {
        assert!(PathValidator::validate_manifest_path("/etc/hostname").is_err());
    }
}
