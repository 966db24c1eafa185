use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pip-upgrader",
    about = "Upgrade pip packages while keeping control over pinned versions",
    version,
    author
)]
pub struct Cli {
    /// Path to the requirements file
    #[arg(long, value_name = "PATH", default_value = "requirements.txt")]
    pub requirements: PathBuf,

    /// Only show warnings and errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Show proposed changes without touching files or packages
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip upgrading pip itself before processing
    #[arg(long)]
    pub skip_pip: bool,

    /// File listing packages to leave pinned, one per line
    #[arg(long, value_name = "PATH", default_value = "skip_packages.txt")]
    pub skip_file: PathBuf,

    /// Seconds to wait for each pip invocation (0 waits forever)
    #[arg(long, value_name = "SECS", default_value_t = 900)]
    pub timeout: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pip_layout() {
        let cli = Cli::parse_from(["pip-upgrader"]);
        assert_eq!(cli.requirements, PathBuf::from("requirements.txt"));
        assert_eq!(cli.skip_file, PathBuf::from("skip_packages.txt"));
        assert!(!cli.quiet && !cli.dry_run && !cli.skip_pip);
        assert_eq!(cli.timeout, 900);
    }

    #[test]
    fn parses_all_flags() {
        let cli = Cli::parse_from([
            "pip-upgrader",
            "--requirements",
            "dev-requirements.txt",
            "--quiet",
            "--dry-run",
            "--skip-pip",
            "--timeout",
            "0",
        ]);
        assert_eq!(cli.requirements, PathBuf::from("dev-requirements.txt"));
        assert!(cli.quiet && cli.dry_run && cli.skip_pip);
        assert_eq!(cli.timeout, 0);
    }
}
