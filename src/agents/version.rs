use std::cmp::Ordering;

/// Installed or published package version, ordered leniently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    pub original: String,
    pub parsed: VersionType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionType {
    Release {
        segments: Vec<u64>,
        suffix: ReleaseSuffix,
    },
    Unknown(String),
}

/// Ordered as declared: `1.0.dev0 < 1.0rc1 < 1.0 < 1.0.post1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReleaseSuffix {
    Dev(String),
    Pre(String),
    Final,
    Post(String),
}

impl PackageVersion {
    pub fn parse(version: &str) -> Self {
        let version = version.trim();
        let parsed = if let Ok(v) = semver::Version::parse(version) {
            VersionType::Release {
                segments: vec![v.major, v.minor, v.patch],
                suffix: if v.pre.is_empty() {
                    ReleaseSuffix::Final
                } else {
                    ReleaseSuffix::Pre(v.pre.to_string())
                },
            }
        } else if let Some((segments, suffix)) = Self::parse_release(version) {
            VersionType::Release { segments, suffix }
        } else {
            VersionType::Unknown(version.to_string())
        };

        PackageVersion {
            original: version.to_string(),
            parsed,
        }
    }

    fn parse_release(version: &str) -> Option<(Vec<u64>, ReleaseSuffix)> {
        let version = version.strip_prefix(['v', 'V']).unwrap_or(version);
        let split = version
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(version.len());
        let (release, rest) = version.split_at(split);

        let mut segments = Vec::new();
        for part in release.trim_end_matches('.').split('.') {
            segments.push(part.parse::<u64>().ok()?);
        }

        let rest = rest.trim_start_matches(['.', '-', '_']).to_lowercase();
        let suffix = if rest.is_empty() {
            ReleaseSuffix::Final
        } else if rest.starts_with("post")
            || rest.starts_with("rev")
            || (rest.starts_with('r') && rest[1..].chars().all(|c| c.is_ascii_digit()))
        {
            ReleaseSuffix::Post(rest)
        } else if rest.starts_with("dev") {
            ReleaseSuffix::Dev(rest)
        } else {
            ReleaseSuffix::Pre(rest)
        };

        Some((segments, suffix))
    }

    pub fn is_stable(&self) -> bool {
        match &self.parsed {
            VersionType::Release { suffix, .. } => {
                matches!(suffix, ReleaseSuffix::Final | ReleaseSuffix::Post(_))
            }
            VersionType::Unknown(_) => false,
        }
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.parsed, &other.parsed) {
            (
                VersionType::Release {
                    segments: a,
                    suffix: sa,
                },
                VersionType::Release {
                    segments: b,
                    suffix: sb,
                },
            ) => {
                // "2.0" and "2.0.0" are the same release.
                let len = a.len().max(b.len());
                for i in 0..len {
                    let av = a.get(i).copied().unwrap_or(0);
                    let bv = b.get(i).copied().unwrap_or(0);
                    match av.cmp(&bv) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                sa.cmp(sb)
            }
            (VersionType::Unknown(_), VersionType::Release { .. }) => Ordering::Less,
            (VersionType::Release { .. }, VersionType::Unknown(_)) => Ordering::Greater,
            _ => self.original.cmp(&other.original),
        }
    }
}

/// Check if version `candidate` is newer than version `installed`
pub fn is_newer(candidate: &str, installed: &str) -> bool {
    PackageVersion::parse(candidate) > PackageVersion::parse(installed)
}
