// src/version/mod.rs

//! Debian version parsing, ordering, and constraint satisfaction
//!
//! A Debian version is `[epoch:]upstream[-revision]`. Epochs compare
//! numerically first; upstream and revision compare by the dpkg run
//! comparison: alternating non-digit/digit runs left to right, digit runs
//! as integers, non-digit runs character by character where `~` sorts
//! before everything including the empty string and letters sort before
//! non-letters. All constraint checks in the resolver reduce to this
//! ordering, so it must reproduce dpkg exactly.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;

/// A parsed Debian version
///
/// Equality follows the ordering, not the spelling: "1.02" and "1.2" are
/// equal versions.
#[derive(Debug, Clone)]
pub struct Version {
    pub epoch: u64,
    pub upstream: String,
    pub revision: Option<String>,
}

impl Version {
    /// Parse a Debian version string
    ///
    /// Examples:
    /// - "1.2.3" → epoch=0, upstream="1.2.3", revision=None
    /// - "2:1.2.3" → epoch=2, upstream="1.2.3", revision=None
    /// - "1.2.3-4+deb12u1" → epoch=0, upstream="1.2.3", revision=Some("4+deb12u1")
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::VersionParse("empty version string".to_string()));
        }

        let (epoch_str, rest) = match s.find(':') {
            Some(pos) => (&s[..pos], &s[pos + 1..]),
            None => ("", s),
        };

        let epoch = if epoch_str.is_empty() {
            0
        } else {
            // All digits, no sign: `u64::parse` alone would admit `+1`.
            if !epoch_str.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::VersionParse(format!(
                    "invalid epoch in '{}': must be all digits",
                    s
                )));
            }
            epoch_str.parse::<u64>().map_err(|e| {
                Error::VersionParse(format!("invalid epoch in '{}': {}", s, e))
            })?
        };

        // Revision is everything after the *last* hyphen; upstream versions
        // may themselves contain hyphens.
        let (upstream, revision) = match rest.rfind('-') {
            Some(pos) => (rest[..pos].to_string(), Some(rest[pos + 1..].to_string())),
            None => (rest.to_string(), None),
        };

        if upstream.is_empty() {
            return Err(Error::VersionParse(format!(
                "empty upstream component in '{}'",
                s
            )));
        }

        Ok(Self {
            epoch,
            upstream,
            revision,
        })
    }

    /// Compare against another version in dpkg order
    pub fn compare(&self, other: &Version) -> Ordering {
        match self.epoch.cmp(&other.epoch) {
            Ordering::Equal => {}
            ord => return ord,
        }

        match verrevcmp(&self.upstream, &other.upstream) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // Absent revision compares as the empty string, so "1.0" < "1.0-1"
        // and "1.0" > "1.0-~rc" hold the way dpkg orders them.
        verrevcmp(
            self.revision.as_deref().unwrap_or(""),
            other.revision.as_deref().unwrap_or(""),
        )
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.upstream)?;
        if let Some(ref revision) = self.revision {
            write!(f, "-{}", revision)?;
        }
        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Character weight for non-digit run comparison
///
/// `~` sorts before everything (including end-of-string), letters sort by
/// their own value, and every other character sorts after all letters.
#[inline]
fn char_order(c: u8) -> i32 {
    if c == b'~' {
        -1
    } else if c.is_ascii_digit() {
        0
    } else if c.is_ascii_alphabetic() {
        c as i32
    } else if c == 0 {
        0
    } else {
        c as i32 + 256
    }
}

/// dpkg's run comparison over upstream or revision strings
fn verrevcmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0usize, 0usize);

    let at = |s: &[u8], k: usize| -> u8 {
        if k < s.len() {
            s[k]
        } else {
            0
        }
    };

    while i < a.len() || j < b.len() {
        // Non-digit runs, character by character
        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let ac = char_order(at(a, i));
            let bc = char_order(at(b, j));
            if ac != bc {
                return ac.cmp(&bc);
            }
            i += 1;
            j += 1;
        }

        // Digit runs as integers: skip leading zeros, then the first
        // differing digit decides unless one run is longer.
        while at(a, i) == b'0' {
            i += 1;
        }
        while at(b, j) == b'0' {
            j += 1;
        }

        let mut first_diff = Ordering::Equal;
        while at(a, i).is_ascii_digit() && at(b, j).is_ascii_digit() {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }
        if at(a, i).is_ascii_digit() {
            return Ordering::Greater;
        }
        if at(b, j).is_ascii_digit() {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}

/// Version constraint comparators as they appear in dependency expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `<<` strictly earlier
    StrictlyEarlier,
    /// `<=` earlier or equal
    EarlierOrEqual,
    /// `=` exactly equal
    Exactly,
    /// `>=` later or equal
    LaterOrEqual,
    /// `>>` strictly later
    StrictlyLater,
}

impl Comparator {
    /// Parse a comparator token. Bare `<` and `>` are the legacy spellings
    /// of `<=` and `>=` and are accepted the way dpkg accepts them.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "<<" => Some(Self::StrictlyEarlier),
            "<=" | "<" => Some(Self::EarlierOrEqual),
            "=" => Some(Self::Exactly),
            ">=" | ">" => Some(Self::LaterOrEqual),
            ">>" => Some(Self::StrictlyLater),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StrictlyEarlier => "<<",
            Self::EarlierOrEqual => "<=",
            Self::Exactly => "=",
            Self::LaterOrEqual => ">=",
            Self::StrictlyLater => ">>",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parenthesized version constraint on a dependency alternative
///
/// An absent constraint is always satisfied; that case is `Option<Constraint>`
/// at the use sites, not a variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub comparator: Comparator,
    pub version: Version,
}

impl Constraint {
    pub fn new(comparator: Comparator, version: Version) -> Self {
        Self {
            comparator,
            version,
        }
    }

    /// Check whether `candidate` satisfies this constraint
    pub fn satisfies(&self, candidate: &Version) -> bool {
        match self.comparator {
            Comparator::StrictlyEarlier => candidate < &self.version,
            Comparator::EarlierOrEqual => candidate <= &self.version,
            Comparator::Exactly => candidate == &self.version,
            Comparator::LaterOrEqual => candidate >= &self.version,
            Comparator::StrictlyLater => candidate > &self.version,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.comparator, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_simple() {
        let ver = v("1.2.3");
        assert_eq!(ver.epoch, 0);
        assert_eq!(ver.upstream, "1.2.3");
        assert_eq!(ver.revision, None);
    }

    #[test]
    fn test_parse_with_epoch_and_revision() {
        let ver = v("1:2.3.4-5+deb12u1");
        assert_eq!(ver.epoch, 1);
        assert_eq!(ver.upstream, "2.3.4");
        assert_eq!(ver.revision, Some("5+deb12u1".to_string()));
    }

    #[test]
    fn test_parse_hyphen_in_upstream() {
        // Revision splits at the last hyphen
        let ver = v("2.4-rc1-3");
        assert_eq!(ver.upstream, "2.4-rc1");
        assert_eq!(ver.revision, Some("3".to_string()));
    }

    #[test]
    fn test_parse_empty_upstream_rejected() {
        assert!(Version::parse("1:").is_err());
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn test_parse_bad_epoch_rejected() {
        assert!(Version::parse("a:1.0").is_err());
    }

    #[test]
    fn test_parse_signed_epoch_rejected() {
        assert!(Version::parse("+1:2.0").is_err());
        assert!(Version::parse("-1:2.0").is_err());
    }

    #[test]
    fn test_epoch_dominates() {
        assert!(v("1:1.0") > v("2.0"));
    }

    #[test]
    fn test_tilde_sorts_before_release() {
        assert!(v("1.0~beta1") < v("1.0"));
        assert!(v("1.0~beta1") < v("1.0~beta2"));
        assert!(v("1.0~~") < v("1.0~"));
    }

    #[test]
    fn test_numeric_runs_compare_as_integers() {
        assert!(v("1.0.1") > v("1.0"));
        assert!(v("1.10") > v("1.9"));
        assert!(v("1.02") == v("1.2"));
    }

    #[test]
    fn test_letters_before_non_letters() {
        // 'a' (alpha) sorts before '+' (shifted past letters)
        assert!(v("1.0a") < v("1.0+"));
    }

    #[test]
    fn test_revision_ordering() {
        assert!(v("1.2.3-1") < v("1.2.3-2"));
        assert!(v("1.2.3") < v("1.2.3-1"));
        assert!(v("1.2.3-1~bpo1") < v("1.2.3-1"));
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(v("1.2.3").to_string(), "1.2.3");
        assert_eq!(v("2:1.2.3-4").to_string(), "2:1.2.3-4");
    }

    #[test]
    fn test_comparator_parse() {
        assert_eq!(Comparator::parse("<<"), Some(Comparator::StrictlyEarlier));
        assert_eq!(Comparator::parse(">="), Some(Comparator::LaterOrEqual));
        // Legacy spellings
        assert_eq!(Comparator::parse("<"), Some(Comparator::EarlierOrEqual));
        assert_eq!(Comparator::parse(">"), Some(Comparator::LaterOrEqual));
        assert_eq!(Comparator::parse("~="), None);
    }

    #[test]
    fn test_constraint_satisfies() {
        let c = Constraint::new(Comparator::LaterOrEqual, v("2.0"));
        assert!(c.satisfies(&v("2.0")));
        assert!(c.satisfies(&v("2.1")));
        assert!(!c.satisfies(&v("1.5")));

        let c = Constraint::new(Comparator::StrictlyEarlier, v("2.0"));
        assert!(c.satisfies(&v("1.9")));
        assert!(!c.satisfies(&v("2.0")));

        let c = Constraint::new(Comparator::Exactly, v("1.0-1"));
        assert!(c.satisfies(&v("1.0-1")));
        assert!(!c.satisfies(&v("1.0-2")));
    }
}
