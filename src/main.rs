mod agents;
mod cli;
mod error;
mod utils;
mod workflow;

use clap::Parser;
use cli::Cli;
use colored::Colorize;
use std::process;
use std::time::Duration;
use utils::Logger;
use workflow::{UpgradeOptions, UpgradeOutcome};

fn main() {
    let cli = Cli::parse();
    let logger = Logger::new(cli.quiet);

    let options = UpgradeOptions {
        requirements: cli.requirements,
        skip_file: cli.skip_file,
        dry_run: cli.dry_run,
        skip_pip: cli.skip_pip,
        timeout: (cli.timeout > 0).then_some(Duration::from_secs(cli.timeout)),
    };

    match workflow::execute_upgrade(options, logger) {
        Ok(outcome) if !cli.quiet => print_summary(&outcome),
        Ok(_) => {}
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

fn print_summary(outcome: &UpgradeOutcome) {
    match outcome {
        UpgradeOutcome::Simulated(report) => {
            println!(
                "\n{}",
                format!(
                    "Dry run: {} upgrade(s) available, {} pin(s) would be relaxed",
                    report.planned.len(),
                    report.relaxed_pins.len()
                )
                .cyan()
                .bold()
            );
            for planned in &report.planned {
                println!("  • {}", planned.to_string().green());
            }
            if !report.unresolved.is_empty() {
                println!(
                    "{}",
                    format!("  Could not check: {}", report.unresolved.join(", ")).dimmed()
                );
            }
        }
        UpgradeOutcome::Upgraded(report) if report.is_empty() => {
            println!("\n{}", "✨ All packages were already up to date".green().bold());
        }
        UpgradeOutcome::Upgraded(report) => {
            println!(
                "\n{}",
                format!("✨ Upgraded {} package(s)", report.changes.len())
                    .green()
                    .bold()
            );
            for change in &report.changes {
                println!(
                    "  • {} {} → {}",
                    change.name.white().bold(),
                    change.old_version.red(),
                    change.new_version.green().bold()
                );
            }
        }
        UpgradeOutcome::RolledBack {
            backup,
            diagnostic,
            restored: true,
        } => {
            println!(
                "\n{}",
                "⚠ Package upgrade failed; requirements file restored".yellow().bold()
            );
            println!("  backup: {}", backup.display().to_string().dimmed());
            if !diagnostic.is_empty() {
                println!("  {}", diagnostic.red());
            }
        }
        UpgradeOutcome::RolledBack {
            backup,
            diagnostic,
            restored: false,
        } => {
            println!(
                "\n{}",
                "✗ Package upgrade failed and the requirements file could not be restored"
                    .red()
                    .bold()
            );
            println!(
                "  restore it manually from: {}",
                backup.display().to_string().yellow()
            );
            if !diagnostic.is_empty() {
                println!("  {}", diagnostic.red());
            }
        }
    }
}
