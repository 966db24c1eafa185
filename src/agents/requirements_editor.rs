use crate::agents::skip_list::SkipList;
use crate::error::{Result, UpgraderError};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Name, optional extras, then `==`. Anything after a marker or URL is left alone.
const EXACT_PIN_PATTERN: &str = r"^\s*([A-Za-z0-9][A-Za-z0-9._-]*)\s*(?:\[[^\]]*\])?\s*==";

/// An exact pin that was (or would be) relaxed to a minimum version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaxedPin {
    pub name: String,
    pub before: String,
    pub after: String,
}

/// RequirementsEditor rewrites `pkg==ver` pins into `pkg>=ver`
pub struct RequirementsEditor {
    requirements_path: PathBuf,
}

impl RequirementsEditor {
    pub fn new<P: AsRef<Path>>(requirements_path: P) -> Self {
        Self {
            requirements_path: requirements_path.as_ref().to_path_buf(),
        }
    }

    /// Rewrite the file in place. The whole file is read before anything
    /// is written back.
    pub fn relax_pins(&self, skip: &SkipList) -> Result<Vec<RelaxedPin>> {
        let content = self.load()?;
        let (rewritten, relaxed) = relax_content(&content, skip)?;

        if !relaxed.is_empty() {
            fs::write(&self.requirements_path, rewritten).map_err(|e| {
                UpgraderError::Manifest(format!(
                    "Failed to write {}: {e}",
                    self.requirements_path.display()
                ))
            })?;
        }

        Ok(relaxed)
    }

    /// Same as [`relax_pins`](Self::relax_pins) without writing anything.
    pub fn preview(&self, skip: &SkipList) -> Result<Vec<RelaxedPin>> {
        let content = self.load()?;
        relax_content(&content, skip).map(|(_, relaxed)| relaxed)
    }

    fn load(&self) -> Result<String> {
        fs::read_to_string(&self.requirements_path).map_err(|e| {
            UpgraderError::Manifest(format!(
                "Failed to read {}: {e}",
                self.requirements_path.display()
            ))
        })
    }
}

/// Relax every exact pin not named in `skip`.
///
/// Blank lines, comments, `===` pins, skipped packages and every other
/// line come back byte-identical, including their line endings.
pub fn relax_content(content: &str, skip: &SkipList) -> Result<(String, Vec<RelaxedPin>)> {
    let pattern = Regex::new(EXACT_PIN_PATTERN)
        .map_err(|e| UpgraderError::Manifest(format!("Regex error: {e}")))?;

    let mut rewritten = String::with_capacity(content.len());
    let mut relaxed = Vec::new();

    for line in content.split_inclusive('\n') {
        match relax_line(&pattern, line, skip) {
            Some((new_line, pin)) => {
                rewritten.push_str(&new_line);
                relaxed.push(pin);
            }
            None => rewritten.push_str(line),
        }
    }

    Ok((rewritten, relaxed))
}

fn relax_line(pattern: &Regex, line: &str, skip: &SkipList) -> Option<(String, RelaxedPin)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let captures = pattern.captures(line)?;
    let operator_end = captures.get(0)?.end();
    // `===` is arbitrary equality; a pin with no version is malformed.
    let version = line[operator_end..].trim_start();
    if line[operator_end..].starts_with('=')
        || version.is_empty()
        || version.starts_with([';', '#'])
    {
        return None;
    }

    let name = captures.get(1)?.as_str().to_lowercase();
    if skip.contains(&name) {
        return None;
    }

    let operator_start = operator_end - 2;
    let new_line = format!("{}>={}", &line[..operator_start], &line[operator_end..]);
    let pin = RelaxedPin {
        name,
        before: trimmed.to_string(),
        after: new_line.trim().to_string(),
    };
    Some((new_line, pin))
}
