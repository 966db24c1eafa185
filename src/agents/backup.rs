use crate::error::{Result, UpgraderError};
use jiff::Zoned;
use std::fs;
use std::path::{Path, PathBuf};

/// A timestamped copy of the requirements file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
}

/// BackupAgent copies the requirements file aside before it is modified
/// and copies it back when a later step fails.
pub struct BackupAgent {
    requirements_path: PathBuf,
}

impl BackupAgent {
    pub fn new<P: AsRef<Path>>(requirements_path: P) -> Self {
        Self {
            requirements_path: requirements_path.as_ref().to_path_buf(),
        }
    }

    /// Copy the requirements file to `<stem>_backup_<YYYYmmdd_HHMMSS>.<ext>`
    /// next to it.
    pub fn create(&self) -> Result<Backup> {
        let timestamp = Zoned::now().strftime("%Y%m%d_%H%M%S").to_string();
        let path = self.available_backup_path(&timestamp);

        fs::copy(&self.requirements_path, &path).map_err(|e| {
            UpgraderError::Backup(format!(
                "Failed to copy {} to {}: {e}",
                self.requirements_path.display(),
                path.display()
            ))
        })?;

        tracing::info!("Created backup: {}", path.display());
        Ok(Backup { path })
    }

    /// Copy the backup back over the requirements file.
    ///
    /// Best effort: a failure is logged and reported as `false`.
    pub fn restore(&self, backup: &Backup) -> bool {
        match fs::copy(&backup.path, &self.requirements_path) {
            Ok(_) => {
                tracing::info!(
                    "Restored {} from backup",
                    self.requirements_path.display()
                );
                true
            }
            Err(e) => {
                tracing::error!("Failed to restore backup {}: {}", backup.path.display(), e);
                false
            }
        }
    }

    fn available_backup_path(&self, timestamp: &str) -> PathBuf {
        let dir = self
            .requirements_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut attempt = 0;
        loop {
            let candidate = dir.join(backup_file_name(&self.requirements_path, timestamp, attempt));
            if !candidate.exists() {
                return candidate;
            }
            attempt += 1;
        }
    }
}

fn backup_file_name(requirements_path: &Path, timestamp: &str, attempt: u32) -> String {
    let stem = requirements_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "requirements".to_string());
    let suffix = if attempt == 0 {
        String::new()
    } else {
        format!("_{attempt}")
    };

    match requirements_path.extension() {
        Some(ext) => format!(
            "{stem}_backup_{timestamp}{suffix}.{}",
            ext.to_string_lossy()
        ),
        None => format!("{stem}_backup_{timestamp}{suffix}"),
    }
}
