use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Lower-cased package names that keep their exact pins and are left out of
/// the change report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipList {
    names: BTreeSet<String>,
}

impl SkipList {
    /// Read the skip list at `path`.
    ///
    /// A missing file means nothing is skipped. A file that exists but cannot
    /// be read is logged and treated the same way.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::error!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Self {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.trim().to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for SkipList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|name| name.as_ref().trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let skip = SkipList::load(dir.path().join("skip_packages.txt"));
        assert!(skip.is_empty());
    }

    #[test]
    fn trims_and_drops_blank_lines() {
        let skip = SkipList::parse("  Flask  \n\n# keep numpy pinned too\nnumpy\n   \n");
        assert_eq!(skip.iter().count(), 2);
        assert!(skip.contains("flask"));
        assert!(skip.contains("FLASK"));
        assert!(skip.contains("numpy"));
        assert!(!skip.contains("requests"));
    }

    #[test]
    fn unreadable_file_is_empty() {
        let dir = tempdir().unwrap();
        // A directory exists but cannot be read as text.
        let skip = SkipList::load(dir.path());
        assert!(skip.is_empty());
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("skip_packages.txt");
        std::fs::write(&path, "django\r\nCelery\n").unwrap();
        let skip = SkipList::load(&path);
        assert_eq!(skip.iter().collect::<Vec<_>>(), vec!["celery", "django"]);
    }
}
