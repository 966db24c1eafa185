use crate::agents::{
    Backup, BackupAgent, ChangeReport, CommandOutcome, EnvironmentScanner, PackageManager,
    PackageSnapshot, PackageVersion, PipExecutionAgent, PlannedUpgrade, RequirementsEditor,
    SimulationReport, SkipList, is_newer, parse_latest_version,
};
use crate::error::{Result, UpgraderError};
use crate::utils::Logger;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings taken from the command line.
#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    pub requirements: PathBuf,
    pub skip_file: PathBuf,
    pub dry_run: bool,
    pub skip_pip: bool,
    /// `None` waits for pip indefinitely.
    pub timeout: Option<Duration>,
}

/// How an upgrade run ended.
#[derive(Debug)]
pub enum UpgradeOutcome {
    /// Dry run: nothing on disk or in the environment changed.
    Simulated(SimulationReport),
    Upgraded(ChangeReport),
    /// pip failed; `restored` says whether the requirements file was put
    /// back from `backup`.
    RolledBack {
        backup: PathBuf,
        diagnostic: String,
        restored: bool,
    },
}

/// Validate the environment and run the upgrade with the real pip.
pub fn execute_upgrade(options: UpgradeOptions, logger: Logger) -> Result<UpgradeOutcome> {
    let pip = PipExecutionAgent::new(options.timeout);

    let environment =
        logger.scope(|| EnvironmentScanner::new(&options.requirements).validate(&pip))?;
    logger.scope(|| tracing::info!("Using {}", environment.pip_version));

    let upgrader = Upgrader::new(pip, environment.requirements_path, options, logger);
    upgrader.upgrade()
}

/// Drives one upgrade: skip list, snapshots, backup, rewrite, install, report.
pub struct Upgrader<P: PackageManager> {
    pip: P,
    requirements_path: PathBuf,
    options: UpgradeOptions,
    logger: Logger,
    backups: BackupAgent,
    editor: RequirementsEditor,
}

impl<P: PackageManager> Upgrader<P> {
    pub fn new<R: AsRef<Path>>(
        pip: P,
        requirements_path: R,
        options: UpgradeOptions,
        logger: Logger,
    ) -> Self {
        let requirements_path = requirements_path.as_ref().to_path_buf();
        Self {
            backups: BackupAgent::new(&requirements_path),
            editor: RequirementsEditor::new(&requirements_path),
            pip,
            requirements_path,
            options,
            logger,
        }
    }

    /// Run the whole sequence with this upgrader's logger active.
    pub fn upgrade(&self) -> Result<UpgradeOutcome> {
        self.logger.scope(|| {
            let result = self.run();
            match &result {
                Ok(_) => tracing::info!("Script execution finished successfully."),
                Err(e) => tracing::error!("Error during upgrade process: {}", e),
            }
            result
        })
    }

    fn run(&self) -> Result<UpgradeOutcome> {
        if !self.options.skip_pip && !self.options.dry_run {
            self.upgrade_pip_if_available()?;
        }

        let skipped = self.list_skipped_packages();
        if !skipped.is_empty() {
            tracing::info!(
                "Skipping packages: {}",
                skipped.iter().collect::<Vec<_>>().join(", ")
            );
        }

        let before = self.snapshot_installed()?;

        if self.options.dry_run {
            tracing::info!("DRY RUN - No changes will be made");
            return Ok(UpgradeOutcome::Simulated(self.simulate(&before, &skipped)?));
        }

        let Some(backup) = self.backup_manifest() else {
            return Err(UpgraderError::Backup(
                "Failed to create backup, aborting".to_string(),
            ));
        };

        if let Err(e) = self.rewrite_manifest(&skipped) {
            self.restore_manifest(&backup);
            return Err(e);
        }

        tracing::info!("Upgrading packages...");
        let outcome = match self.run_upgrade() {
            Ok(outcome) => outcome,
            Err(e) => {
                self.restore_manifest(&backup);
                return Err(e);
            }
        };

        if !outcome.succeeded {
            let restored = self.restore_manifest(&backup);
            if restored {
                tracing::error!("Package upgrade failed, restored backup");
            } else {
                tracing::error!(
                    "Package upgrade failed and the backup could not be restored from {}",
                    backup.path.display()
                );
            }
            return Ok(UpgradeOutcome::RolledBack {
                backup: backup.path,
                diagnostic: outcome.diagnostic,
                restored,
            });
        }

        let after = self.snapshot_installed()?;
        Ok(UpgradeOutcome::Upgraded(
            self.report_changes(&before, &after, &skipped),
        ))
    }

    /// Upgrade pip itself; a failure only warns.
    pub fn upgrade_pip_if_available(&self) -> Result<()> {
        tracing::info!("Checking if pip needs an upgrade...");
        let outcome = self.pip.self_upgrade()?;
        if outcome.succeeded {
            tracing::info!("Pip upgrade check complete.");
        } else {
            tracing::warn!("Could not upgrade pip: {}", outcome.diagnostic);
        }
        Ok(())
    }

    pub fn list_skipped_packages(&self) -> SkipList {
        SkipList::load(&self.options.skip_file)
    }

    pub fn snapshot_installed(&self) -> Result<PackageSnapshot> {
        let snapshot = PackageSnapshot::capture(&self.pip)?;
        tracing::debug!("Found {} installed packages", snapshot.len());
        if let Some(diagnostic) = &snapshot.diagnostic {
            tracing::warn!("pip freeze reported an error: {}", diagnostic);
        }
        Ok(snapshot)
    }

    pub fn rewrite_manifest(&self, skipped: &SkipList) -> Result<()> {
        let relaxed = self.editor.relax_pins(skipped)?;
        tracing::info!(
            "Relaxed {} pinned requirement(s) in {}",
            relaxed.len(),
            self.requirements_path.display()
        );
        Ok(())
    }

    /// Back up the requirements file, or log why it failed and return
    /// `None`. Aborting on `None` is up to the caller: the real upgrade does,
    /// a dry run would carry on.
    pub fn backup_manifest(&self) -> Option<Backup> {
        self.backups
            .create()
            .inspect_err(|e| tracing::error!("Failed to create backup: {}", e))
            .ok()
    }

    /// Best effort; `false` when the copy back failed.
    pub fn restore_manifest(&self, backup: &Backup) -> bool {
        self.backups.restore(backup)
    }

    pub fn run_upgrade(&self) -> Result<CommandOutcome> {
        self.pip.install_requirements(&self.requirements_path)
    }

    pub fn report_changes(
        &self,
        before: &PackageSnapshot,
        after: &PackageSnapshot,
        skipped: &SkipList,
    ) -> ChangeReport {
        let report = ChangeReport::between(before, after, skipped);
        if !report.is_empty() {
            tracing::info!("Updated packages:");
        }
        for line in report.lines() {
            tracing::info!("{}", line);
        }
        report
    }

    /// Ask the index what each installed package would move to. Reads the
    /// requirements file but never writes it.
    pub fn simulate(
        &self,
        installed: &PackageSnapshot,
        skipped: &SkipList,
    ) -> Result<SimulationReport> {
        tracing::info!("Checking for available upgrades...");
        let mut report = SimulationReport::default();

        let candidates: Vec<(&str, &str)> = installed
            .iter()
            .filter(|(name, _)| !skipped.contains(name))
            .collect();

        let pb = ProgressBar::new(candidates.len() as u64);
        if self.logger.is_quiet() {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) = ProgressStyle::default_bar().template("  [{bar:40}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }

        for (name, current) in candidates {
            pb.set_message(format!("Checking {}", name));
            let outcome = self.pip.index_versions(name)?;
            let latest = outcome
                .succeeded
                .then(|| parse_latest_version(&outcome.output))
                .flatten();

            match latest {
                Some(latest) if is_newer(&latest, current) => {
                    let planned = PlannedUpgrade {
                        name: name.to_string(),
                        installed: current.to_string(),
                        prerelease: !PackageVersion::parse(&latest).is_stable(),
                        latest,
                    };
                    pb.suspend(|| tracing::info!("Would upgrade {}", planned));
                    report.planned.push(planned);
                }
                Some(_) => {}
                None => {
                    pb.suspend(|| tracing::warn!("Could not look up versions for {}", name));
                    report.unresolved.push(name.to_string());
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        match self.editor.preview(skipped) {
            Ok(relaxed) => {
                for pin in &relaxed {
                    tracing::info!("Would relax {} -> {}", pin.before, pin.after);
                }
                report.relaxed_pins = relaxed;
            }
            Err(e) => tracing::warn!("Could not preview requirements rewrite: {}", e),
        }

        if report.is_empty() {
            tracing::info!("All packages are up to date.");
        }
        Ok(report)
    }
}
