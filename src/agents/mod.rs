pub mod backup;
pub mod environment_scanner;
pub mod pip_execution;
pub mod report;
pub mod requirements_editor;
pub mod skip_list;
pub mod snapshot;
pub mod version;

pub use backup::{Backup, BackupAgent};
pub use environment_scanner::EnvironmentScanner;
pub use pip_execution::{CommandOutcome, PackageManager, PipExecutionAgent, parse_latest_version};
pub use report::{ChangeReport, PlannedUpgrade, SimulationReport};
pub use requirements_editor::RequirementsEditor;
pub use skip_list::SkipList;
pub use snapshot::PackageSnapshot;
pub use version::{PackageVersion, is_newer};
