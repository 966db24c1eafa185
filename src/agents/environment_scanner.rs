use crate::agents::pip_execution::PackageManager;
use crate::error::{Result, UpgraderError};
use crate::utils::PathValidator;
use std::path::{Path, PathBuf};

/// EnvironmentScanner validates the configuration before anything is touched
pub struct EnvironmentScanner {
    requirements_path: PathBuf,
}

impl EnvironmentScanner {
    pub fn new<P: AsRef<Path>>(requirements_path: P) -> Self {
        Self {
            requirements_path: requirements_path.as_ref().to_path_buf(),
        }
    }

    /// Checks that the requirements file exists and pip can be run
    pub fn validate(&self, pip: &dyn PackageManager) -> Result<EnvironmentInfo> {
        let requirements_path = PathValidator::validate_manifest_path(&self.requirements_path)?;

        let outcome = pip.version().map_err(|e| {
            UpgraderError::Configuration(format!("pip is not available: {e}"))
        })?;

        if !outcome.succeeded {
            return Err(UpgraderError::Configuration(format!(
                "pip is not installed. Please install pip first. ({})",
                outcome.diagnostic
            )));
        }

        let pip_version = outcome.output.trim().to_string();
        tracing::debug!("Using {}", pip_version);

        Ok(EnvironmentInfo {
            requirements_path,
            pip_version,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentInfo {
    pub requirements_path: PathBuf,
    pub pip_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::pip_execution::CommandOutcome;
    use std::fs;
    use tempfile::tempdir;

    struct FixedPip(Option<CommandOutcome>);

    impl PackageManager for FixedPip {
        fn invoke(&self, _args: &[&str]) -> Result<CommandOutcome> {
            self.0
                .clone()
                .ok_or_else(|| UpgraderError::PipExecution("No such file or directory".into()))
        }
    }

    #[test]
    fn missing_requirements_is_fatal() {
        let dir = tempdir().unwrap();
        let scanner = EnvironmentScanner::new(dir.path().join("requirements.txt"));
        let pip = FixedPip(Some(CommandOutcome::success("pip 24.0")));
        let err = scanner.validate(&pip).unwrap_err();
        assert!(matches!(err, UpgraderError::Configuration(_)));
    }

    #[test]
    fn missing_pip_is_fatal() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("requirements.txt");
        fs::write(&file, "requests==2.28.0\n").unwrap();

        let err = EnvironmentScanner::new(&file)
            .validate(&FixedPip(None))
            .unwrap_err();
        assert!(matches!(err, UpgraderError::Configuration(msg) if msg.contains("not available")));

        let err = EnvironmentScanner::new(&file)
            .validate(&FixedPip(Some(CommandOutcome::failure(Some(1), "No module named pip"))))
            .unwrap_err();
        assert!(matches!(err, UpgraderError::Configuration(msg) if msg.contains("not installed")));
    }

    #[test]
    fn reports_pip_version() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("requirements.txt");
        fs::write(&file, "requests==2.28.0\n").unwrap();

        let info = EnvironmentScanner::new(&file)
            .validate(&FixedPip(Some(CommandOutcome::success("pip 24.0 from /usr/lib\n"))))
            .unwrap();
        assert_eq!(info.pip_version, "pip 24.0 from /usr/lib");
        assert!(info.requirements_path.is_absolute());
    }
}
