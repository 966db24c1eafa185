use crate::error::{Result, UpgraderError};
use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of a package-manager invocation.
///
/// A non-zero exit is a value here, not an error: callers decide whether
/// it warrants a rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub succeeded: bool,
    pub exit_code: Option<i32>,
    pub output: String,
    pub diagnostic: String,
}

impl CommandOutcome {
    #[cfg(test)]
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            exit_code: Some(0),
            output: output.into(),
            diagnostic: String::new(),
        }
    }

    pub fn failure(exit_code: Option<i32>, diagnostic: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            exit_code,
            output: String::new(),
            diagnostic: diagnostic.into(),
        }
    }
}

/// Anything that can run pip with an argument list.
///
/// `invoke` only fails when the process cannot be run at all.
pub trait PackageManager {
    fn invoke(&self, args: &[&str]) -> Result<CommandOutcome>;

    fn version(&self) -> Result<CommandOutcome> {
        self.invoke(&["--version"])
    }

    fn freeze(&self) -> Result<CommandOutcome> {
        self.invoke(&["freeze"])
    }

    fn self_upgrade(&self) -> Result<CommandOutcome> {
        self.invoke(&["install", "--upgrade", "pip", "-q"])
    }

    fn install_requirements(&self, requirements: &Path) -> Result<CommandOutcome> {
        let requirements = requirements.to_string_lossy();
        self.invoke(&["install", "-r", requirements.as_ref(), "--upgrade"])
    }

    fn index_versions(&self, package: &str) -> Result<CommandOutcome> {
        self.invoke(&["index", "versions", package])
    }
}

/// PipExecutionAgent runs `<python> -m pip ...` as a child process
pub struct PipExecutionAgent {
    python: String,
    timeout: Option<Duration>,
}

impl PipExecutionAgent {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            python: default_python().to_string(),
            timeout,
        }
    }

    #[cfg(test)]
    fn with_python(python: &str, timeout: Option<Duration>) -> Self {
        Self {
            python: python.to_string(),
            timeout,
        }
    }

    fn describe(&self, args: &[&OsStr]) -> String {
        let args: Vec<_> = args.iter().map(|arg| arg.to_string_lossy()).collect();
        format!("{} -m pip {}", self.python, args.join(" "))
    }

    fn wait(&self, child: &mut Child, command: &str) -> Result<Option<ExitStatus>> {
        let Some(limit) = self.timeout else {
            return child.wait().map(Some).map_err(|e| {
                UpgraderError::PipExecution(format!("Failed to wait for '{command}': {e}"))
            });
        };

        let started = Instant::now();
        loop {
            let status = child.try_wait().map_err(|e| {
                UpgraderError::PipExecution(format!("Failed to poll '{command}': {e}"))
            })?;
            if status.is_some() {
                return Ok(status);
            }

            if started.elapsed() >= limit {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn execute(&self, args: &[&OsStr]) -> Result<CommandOutcome> {
        let command = self.describe(args);
        tracing::debug!("Executing: {}", command);

        let mut child = Command::new(&self.python)
            .args(["-m", "pip"])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                UpgraderError::PipExecution(format!("Failed to execute '{command}': {e}"))
            })?;

        // Drain both pipes so a chatty install cannot block on a full buffer.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let Some(status) = self.wait(&mut child, &command)? else {
            // A grandchild (build backend, pyenv shim target) may still hold
            // the pipes open, so the drain threads are left detached.
            drop((stdout, stderr));
            let limit = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
            tracing::error!("'{}' timed out after {}s", command, limit);
            return Ok(CommandOutcome::failure(
                None,
                format!("timed out after {limit}s"),
            ));
        };
        let output = collect(stdout);
        let errors = collect(stderr);

        if !status.success() {
            tracing::error!("Error running pip command '{}': {}", command, status);
            tracing::debug!("Command output: {}", output.trim_end());
        }

        let diagnostic = match errors.trim() {
            "" if !status.success() => format!(
                "pip exited with code {}",
                status.code().map_or_else(|| "unknown".to_string(), |c| c.to_string())
            ),
            text => text.to_string(),
        };

        Ok(CommandOutcome {
            succeeded: status.success(),
            exit_code: status.code(),
            output,
            diagnostic,
        })
    }
}

impl PackageManager for PipExecutionAgent {
    fn invoke(&self, args: &[&str]) -> Result<CommandOutcome> {
        let args: Vec<&OsStr> = args.iter().map(OsStr::new).collect();
        self.execute(&args)
    }

    fn install_requirements(&self, requirements: &Path) -> Result<CommandOutcome> {
        self.execute(&[
            OsStr::new("install"),
            OsStr::new("-r"),
            requirements.as_os_str(),
            OsStr::new("--upgrade"),
        ])
    }
}

/// Extract the newest version from `pip index versions <pkg>` output.
///
/// Prefers the `LATEST:` line and falls back to the `name (x.y.z)` header.
pub fn parse_latest_version(output: &str) -> Option<String> {
    let latest = output.lines().find_map(|line| {
        line.trim()
            .strip_prefix("LATEST:")
            .map(|v| v.trim().to_string())
    });
    if latest.as_deref().is_some_and(|v| !v.is_empty()) {
        return latest;
    }

    let header = output.lines().find(|line| !line.trim().is_empty())?;
    let open = header.find('(')?;
    let close = header[open..].find(')')? + open;
    let version = header[open + 1..close].trim();
    (!version.is_empty()).then(|| version.to_string())
}

fn default_python() -> &'static str {
    if cfg!(windows) { "python" } else { "python3" }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_latest_line() {
        let output = "requests (2.31.0)\nAvailable versions: 2.31.0, 2.30.0\n  INSTALLED: 2.28.0\n  LATEST:    2.31.0\n";
        assert_eq!(parse_latest_version(output), Some("2.31.0".to_string()));
    }

    #[test]
    fn falls_back_to_header() {
        let output = "WARNING: pip index is currently an experimental command.\n";
        assert_eq!(parse_latest_version(output), None);

        let output = "flask (3.0.2)\nAvailable versions: 3.0.2, 3.0.1\n";
        assert_eq!(parse_latest_version(output), Some("3.0.2".to_string()));
    }

    /// Write an executable shell script standing in for the python binary.
    #[cfg(unix)]
    fn fake_python(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("python");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_pip_and_returns_promptly() {
        let dir = tempfile::tempdir().unwrap();
        // `sleep` runs as a child of the script and keeps the pipes open
        // after the script itself is killed.
        let python = fake_python(dir.path(), "echo collecting\nsleep 20\necho done");
        let agent = PipExecutionAgent::with_python(&python, Some(Duration::from_secs(1)));

        let started = Instant::now();
        let outcome = agent
            .install_requirements(Path::new("requirements.txt"))
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!outcome.succeeded);
        assert_eq!(outcome.exit_code, None);
        assert_eq!(outcome.diagnostic, "timed out after 1s");
    }

    #[cfg(unix)]
    #[test]
    fn fast_command_finishes_within_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let python = fake_python(dir.path(), "echo 'requests==2.31.0'");
        let agent = PipExecutionAgent::with_python(&python, Some(Duration::from_secs(10)));

        let outcome = agent.freeze().unwrap();
        assert!(outcome.succeeded);
        assert_eq!(outcome.output, "requests==2.31.0\n");
    }

    #[cfg(unix)]
    #[test]
    fn install_passes_non_utf8_paths_through() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let dir = tempfile::tempdir().unwrap();
        // $1=-m $2=pip $3=install $4=-r $5=<requirements>
        let python = fake_python(dir.path(), "[ -f \"$5\" ] && echo found || exit 3");
        let requirements = dir
            .path()
            .join(OsString::from_vec(b"req\xffuirements.txt".to_vec()));
        std::fs::write(&requirements, "six==1.16.0\n").unwrap();

        let agent = PipExecutionAgent::with_python(&python, None);
        let outcome = agent.install_requirements(&requirements).unwrap();
        assert!(outcome.succeeded, "{outcome:?}");
        assert_eq!(outcome.output.trim(), "found");
    }

    #[test]
    fn missing_executable_is_an_error() {
        let agent = PipExecutionAgent::with_python("definitely-not-a-python-binary", None);
        let err = agent.freeze().unwrap_err();
        assert!(matches!(err, UpgraderError::PipExecution(_)));
    }

    #[test]
    fn builds_pip_invocation() {
        let agent = PipExecutionAgent::with_python("python3", None);
        let args = ["install", "-r", "requirements.txt", "--upgrade"].map(OsStr::new);
        assert_eq!(
            agent.describe(&args),
            "python3 -m pip install -r requirements.txt --upgrade"
        );
    }
}
