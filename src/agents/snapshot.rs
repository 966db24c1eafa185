use crate::agents::pip_execution::PackageManager;
use crate::error::Result;
use std::collections::BTreeMap;

/// Installed package versions keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSnapshot {
    packages: BTreeMap<String, String>,
    /// Set when `pip freeze` exited non-zero; the map then holds whatever
    /// was printed before the failure.
    pub diagnostic: Option<String>,
}

impl PackageSnapshot {
    /// Run `pip freeze` and parse its output.
    pub fn capture(pip: &dyn PackageManager) -> Result<Self> {
        let outcome = pip.freeze()?;
        let mut snapshot = Self::parse(&outcome.output);
        if !outcome.succeeded {
            snapshot.diagnostic = Some(outcome.diagnostic);
        }
        Ok(snapshot)
    }

    /// Parse `name==version` lines, ignoring editable and URL installs.
    pub fn parse(freeze_output: &str) -> Self {
        let packages = freeze_output
            .lines()
            .filter_map(|line| {
                let (name, version) = line.split_once("==")?;
                let name = name.trim().to_lowercase();
                let version = version.trim_start_matches('=').trim();
                (!name.is_empty() && !version.is_empty()).then(|| (name, version.to_string()))
            })
            .collect();

        Self {
            packages,
            diagnostic: None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.packages.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.packages
            .iter()
            .map(|(name, version)| (name.as_str(), version.as_str()))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for PackageSnapshot {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            packages: iter
                .into_iter()
                .map(|(name, version)| (name.into().to_lowercase(), version.into()))
                .collect(),
            diagnostic: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::pip_execution::CommandOutcome;
    use crate::error::UpgraderError;

    struct FreezePip(CommandOutcome);

    impl PackageManager for FreezePip {
        fn invoke(&self, args: &[&str]) -> Result<CommandOutcome> {
            assert_eq!(args, ["freeze"]);
            Ok(self.0.clone())
        }
    }

    #[test]
    fn parses_freeze_output() {
        let snapshot = PackageSnapshot::parse(
            "Flask==2.0.1\nrequests==2.28.0\n-e git+https://github.com/org/repo.git#egg=repo\nmypkg @ file:///tmp/mypkg\n",
        );
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("flask"), Some("2.0.1"));
        assert_eq!(snapshot.get("Requests"), Some("2.28.0"));
    }

    #[test]
    fn tolerates_arbitrary_equality() {
        let snapshot = PackageSnapshot::parse("legacy===1.0-custom\n");
        assert_eq!(snapshot.get("legacy"), Some("1.0-custom"));
    }

    #[test]
    fn failed_freeze_is_surfaced() {
        let mut outcome = CommandOutcome::failure(Some(2), "broken environment");
        outcome.output = "six==1.16.0\n".to_string();
        let snapshot = PackageSnapshot::capture(&FreezePip(outcome)).unwrap();
        assert_eq!(snapshot.get("six"), Some("1.16.0"));
        assert_eq!(snapshot.diagnostic.as_deref(), Some("broken environment"));
    }

    #[test]
    fn spawn_failure_propagates() {
        struct MissingPip;
        impl PackageManager for MissingPip {
            fn invoke(&self, _args: &[&str]) -> Result<CommandOutcome> {
                Err(UpgraderError::PipExecution("not found".into()))
            }
        }
        assert!(PackageSnapshot::capture(&MissingPip).is_err());
    }
}
