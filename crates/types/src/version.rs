//! Package versions and version requirements
//!
//! Package versions are dotted numeric strings of any number of release
//! segments (`2`, `1.4`, `1.4.6`, `1.2.3.4`) optionally followed by a
//! prerelease part (`1.0-rc1`, `1.0.rc1`). They are compared segment by
//! segment with missing segments read as zero, so `2` and `2.0.0` are equal,
//! while the string that was written is kept for display and for directory
//! names. The prerelease part only breaks ties and follows semver ordering.
//!
//! Requirements use the package ecosystem operators:
//! - `= 1.2.3` - Exact version (a bare version means the same)
//! - `!= 1.5` - Exclude version
//! - `> 5`, `>= 0`, `< 2`, `<= 2.0` - Ordering bounds
//! - `~> 1.2` - Pessimistic: `>= 1.2, < 2`
//! - Multiple constraints: `>= 1.2, < 2.0, != 1.5`

use rgem_errors::VersionError;
use semver::Prerelease;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A package version
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    release: Vec<u64>,
    pre: Prerelease,
}

impl Version {
    /// Parse a version string
    ///
    /// # Errors
    ///
    /// Returns `VersionError::InvalidVersion` if the string is empty, starts
    /// with a non-numeric segment, or contains invalid characters.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let raw = input.trim();
        let invalid = || VersionError::InvalidVersion {
            input: input.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid());
        }

        let (core, dash_pre) = match raw.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (raw, None),
        };

        let mut release = Vec::new();
        let mut pre_parts = Vec::new();
        for segment in core.split('.') {
            if segment.is_empty() {
                return Err(invalid());
            }
            if pre_parts.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                release.push(segment.parse::<u64>().map_err(|_| invalid())?);
            } else {
                pre_parts.push(segment);
            }
        }

        if release.is_empty() {
            return Err(invalid());
        }
        if let Some(pre) = dash_pre {
            pre_parts.extend(pre.split('.'));
        }

        let pre = if pre_parts.is_empty() {
            Prerelease::EMPTY
        } else {
            Prerelease::new(&pre_parts.join(".")).map_err(|_| invalid())?
        };

        Ok(Self {
            raw: raw.to_string(),
            release,
            pre,
        })
    }

    /// The `0` version, lower bound of the default requirement
    #[must_use]
    pub fn zero() -> Self {
        Self {
            raw: "0".to_string(),
            release: vec![0],
            pre: Prerelease::EMPTY,
        }
    }

    /// Whether `input` is a well-formed version string
    #[must_use]
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// The version exactly as it was written
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric release segments as written
    #[must_use]
    pub fn segments(&self) -> &[u64] {
        &self.release
    }

    /// Whether the version carries a prerelease part
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// Upper bound used by the pessimistic operator
    ///
    /// `1.2.3` bumps to `1.3`, `1.2` bumps to `2`, `1` bumps to `2`.
    #[must_use]
    pub fn bump(&self) -> Version {
        let mut release = self.release.clone();
        if release.len() > 1 {
            release.pop();
        }
        if let Some(last) = release.last_mut() {
            *last += 1;
        }
        let raw = release
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Self {
            raw,
            release,
            pre: Prerelease::EMPTY,
        }
    }

    /// Release segments without trailing zeros
    fn significant(&self) -> &[u64] {
        let len = self
            .release
            .iter()
            .rposition(|&segment| segment != 0)
            .map_or(0, |last| last + 1);
        &self.release[..len]
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
        self.pre.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        let segment = |v: &Version, i: usize| v.release.get(i).copied().unwrap_or(0);
        (0..len)
            .map(|i| segment(self, i).cmp(&segment(other, i)))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Comparison operator of a single constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    NotEq,
    Greater,
    Less,
    GreaterEq,
    LessEq,
    Pessimistic,
}

impl Op {
    fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterEq => ">=",
            Self::LessEq => "<=",
            Self::Pessimistic => "~>",
        }
    }
}

/// A single version constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub op: Op,
    pub version: Version,
}

impl Constraint {
    /// Check if a version satisfies this constraint
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        let v = &self.version;
        match self.op {
            Op::Eq => version == v,
            Op::NotEq => version != v,
            Op::Greater => version > v,
            Op::Less => version < v,
            Op::GreaterEq => version >= v,
            Op::LessEq => version <= v,
            Op::Pessimistic => version >= v && *version < v.bump(),
        }
    }

    /// Parse a single constraint from a string
    fn parse(s: &str) -> Result<Self, VersionError> {
        let s = s.trim();

        // Longest operators first so `>=` is not read as `>`.
        let operators = [
            ("~>", Op::Pessimistic),
            (">=", Op::GreaterEq),
            ("<=", Op::LessEq),
            ("!=", Op::NotEq),
            ("=", Op::Eq),
            (">", Op::Greater),
            ("<", Op::Less),
        ];

        let (op, rest) = operators
            .iter()
            .find_map(|(prefix, op)| s.strip_prefix(*prefix).map(|rest| (*op, rest)))
            .unwrap_or((Op::Eq, s));

        let version = Version::parse(rest.trim()).map_err(|_| VersionError::InvalidConstraint {
            input: s.to_string(),
        })?;

        Ok(Self { op, version })
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.as_str(), self.version)
    }
}

/// A version requirement made of one or more constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    constraints: Vec<Constraint>,
}

impl Requirement {
    /// Create a requirement from a single constraint
    #[must_use]
    pub fn single(op: Op, version: Version) -> Self {
        Self {
            constraints: vec![Constraint { op, version }],
        }
    }

    /// Check if a version satisfies all constraints
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.constraints.iter().all(|c| c.matches(version))
    }

    /// Get the constraints
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Whether this is the default `>= 0` requirement
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl Default for Requirement {
    fn default() -> Self {
        Self::single(Op::GreaterEq, Version::zero())
    }
}

impl FromStr for Requirement {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() || s == "*" {
            return Ok(Self::default());
        }

        let constraints = s
            .split(',')
            .map(Constraint::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { constraints })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self.constraints.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl Serialize for Requirement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Requirement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
