use crate::agents::requirements_editor::RelaxedPin;
use crate::agents::skip_list::SkipList;
use crate::agents::snapshot::PackageSnapshot;
use std::fmt;

/// A package whose installed version moved during the upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageChange {
    pub name: String,
    pub old_version: String,
    pub new_version: String,
}

impl fmt::Display for PackageChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.name, self.old_version, self.new_version)
    }
}

/// Tracks the version differences between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    pub changes: Vec<PackageChange>,
}

impl ChangeReport {
    /// Compare packages present in both snapshots, leaving out `skip`.
    pub fn between(before: &PackageSnapshot, after: &PackageSnapshot, skip: &SkipList) -> Self {
        let changes = before
            .iter()
            .filter(|(name, _)| !skip.contains(name))
            .filter_map(|(name, old_version)| {
                let new_version = after.get(name)?;
                (new_version != old_version).then(|| PackageChange {
                    name: name.to_string(),
                    old_version: old_version.to_string(),
                    new_version: new_version.to_string(),
                })
            })
            .collect();

        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Lines as they are logged; a single notice when nothing moved.
    pub fn lines(&self) -> Vec<String> {
        if self.changes.is_empty() {
            return vec!["No packages were updated.".to_string()];
        }
        self.changes.iter().map(ToString::to_string).collect()
    }
}

/// An upgrade the dry run found on the package index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpgrade {
    pub name: String,
    pub installed: String,
    pub latest: String,
    pub prerelease: bool,
}

impl fmt::Display for PlannedUpgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.name, self.installed, self.latest)?;
        if self.prerelease {
            f.write_str(" (pre-release)")?;
        }
        Ok(())
    }
}

/// What a dry run would have done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub planned: Vec<PlannedUpgrade>,
    /// Packages whose index lookup failed.
    pub unresolved: Vec<String>,
    pub relaxed_pins: Vec<RelaxedPin>,
}

impl SimulationReport {
    pub fn is_empty(&self) -> bool {
        self.planned.is_empty() && self.relaxed_pins.is_empty()
    }
}
