//! Detection of copy-named duplicates such as `report(1).txt` or
//! `photo(2nd copy).jpg`.
//!
//! Patterns are tried against the base name in a fixed order and the first
//! one that matches decides the outcome. Stripping the matched tag gives the
//! presumed original. If that original is in the same listing the file is a
//! [`Duplicate`]; otherwise it is an [`Orphan`], which may be renamed but is
//! never deleted.

use regex::{Captures, Regex};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// The naming pattern that identified a file as a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// `name(copy).ext`
    Copy,
    /// `name(Copy).ext`
    CapitalCopy,
    /// `name(3).ext`
    Counter,
    /// `name(21st copy).ext`
    OrdinalSt,
    /// `name(22nd copy).ext`
    OrdinalNd,
    /// `name(23rd copy).ext`
    OrdinalRd,
    /// `name(11th copy).ext`
    OrdinalTh,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PatternKind::Copy => "(copy)",
            PatternKind::CapitalCopy => "(Copy)",
            PatternKind::Counter => "(N)",
            PatternKind::OrdinalSt => "(Nst copy)",
            PatternKind::OrdinalNd => "(Nnd copy)",
            PatternKind::OrdinalRd => "(Nrd copy)",
            PatternKind::OrdinalTh => "(Nth copy)",
        };
        f.write_str(label)
    }
}

/// A copy whose original is present in the same listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub path: PathBuf,
    pub original: PathBuf,
    pub pattern: PatternKind,
}

/// A copy-named file with no original next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    pub path: PathBuf,
    pub pattern: PatternKind,
    /// Where the file would go once the tag is stripped.
    pub stripped: PathBuf,
}

/// Outcome of [`DuplicateMatcher::find_duplicates`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DuplicateReport {
    pub duplicates: Vec<Duplicate>,
    pub orphans: Vec<Orphan>,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty() && self.orphans.is_empty()
    }
}

/// Returns the English ordinal suffix for `n`.
///
/// 11, 12 and 13 (and 111, 212, ...) take `th`; otherwise the last digit
/// decides.
pub fn ordinal_suffix(n: u64) -> &'static str {
    if (11..=13).contains(&(n % 100)) {
        return "th";
    }
    match n % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

struct DuplicatePattern {
    kind: PatternKind,
    /// The `tag` group is the part removed when stripping.
    regex: Regex,
    /// Extra check on the captures, used for ordinal suffixes.
    accepts: fn(&Captures<'_>) -> bool,
}

impl DuplicatePattern {
    /// Removes the leftmost tag the validator accepts.
    fn strip(&self, file_name: &str) -> Option<String> {
        let tag = self
            .regex
            .captures_iter(file_name)
            .find(|caps| (self.accepts)(caps))?
            .name("tag")?;
        Some(join_around(&file_name[..tag.start()], &file_name[tag.end()..]))
    }
}

fn always(_: &Captures<'_>) -> bool {
    true
}

fn ordinal_is(caps: &Captures<'_>, suffix: &str) -> bool {
    caps.name("n")
        .and_then(|n| n.as_str().parse::<u64>().ok())
        .is_some_and(|n| ordinal_suffix(n) == suffix)
}

fn ordinal_st(caps: &Captures<'_>) -> bool {
    ordinal_is(caps, "st")
}

fn ordinal_nd(caps: &Captures<'_>) -> bool {
    ordinal_is(caps, "nd")
}

fn ordinal_rd(caps: &Captures<'_>) -> bool {
    ordinal_is(caps, "rd")
}

fn ordinal_th(caps: &Captures<'_>) -> bool {
    ordinal_is(caps, "th")
}

/// Ordered set of copy-naming patterns.
pub struct DuplicateMatcher {
    patterns: Vec<DuplicatePattern>,
}

impl DuplicateMatcher {
    pub fn new() -> Self {
        let table: [(PatternKind, &str, fn(&Captures<'_>) -> bool); 7] = [
            (PatternKind::Copy, r"(?P<tag>\(copy\))\.\w+$", always),
            (PatternKind::CapitalCopy, r"(?P<tag>\(Copy\))\.\w+$", always),
            (PatternKind::Counter, r"(?P<tag>\(\d+\))", always),
            (PatternKind::OrdinalSt, r"(?P<tag>\((?P<n>\d+)st copy\))", ordinal_st),
            (PatternKind::OrdinalNd, r"(?P<tag>\((?P<n>\d+)nd copy\))", ordinal_nd),
            (PatternKind::OrdinalRd, r"(?P<tag>\((?P<n>\d+)rd copy\))", ordinal_rd),
            (PatternKind::OrdinalTh, r"(?P<tag>\((?P<n>\d+)th copy\))", ordinal_th),
        ];
        let patterns = table
            .into_iter()
            .map(|(kind, source, accepts)| DuplicatePattern {
                kind,
                regex: Regex::new(source).expect("duplicate patterns are valid literals"),
                accepts,
            })
            .collect();
        Self { patterns }
    }

    /// Returns the first pattern that matches `file_name` and the name with
    /// its tag removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use packrat::duplicates::{DuplicateMatcher, PatternKind};
    ///
    /// let matcher = DuplicateMatcher::new();
    /// assert_eq!(
    ///     matcher.match_name("report (2).txt"),
    ///     Some((PatternKind::Counter, "report.txt".to_string()))
    /// );
    /// assert_eq!(matcher.match_name("file(11st copy).txt"), None);
    /// ```
    pub fn match_name(&self, file_name: &str) -> Option<(PatternKind, String)> {
        self.patterns
            .iter()
            .find_map(|pattern| Some((pattern.kind, pattern.strip(file_name)?)))
    }

    /// Strips the tag of `kind` from `file_name`, if that pattern matches.
    pub fn strip(&self, file_name: &str, kind: PatternKind) -> Option<String> {
        self.patterns
            .iter()
            .find(|p| p.kind == kind)?
            .strip(file_name)
    }

    /// Splits `paths` into duplicates with an original and orphans.
    ///
    /// Every path yields at most one finding, from the first pattern that
    /// matches its base name. Paths that match nothing are left out.
    pub fn find_duplicates(&self, paths: &[PathBuf]) -> DuplicateReport {
        let listing: HashSet<&Path> = paths.iter().map(PathBuf::as_path).collect();
        let mut report = DuplicateReport::default();

        for path in paths {
            let Some(file_name) = path.file_name().map(|n| n.to_string_lossy()) else {
                continue;
            };
            let Some((pattern, stripped_name)) = self.match_name(&file_name) else {
                continue;
            };
            if stripped_name.is_empty() {
                continue;
            }
            let stripped = path.with_file_name(&stripped_name);

            if stripped != *path && listing.contains(stripped.as_path()) {
                tracing::debug!(
                    duplicate = %file_name,
                    original = %stripped_name,
                    %pattern,
                    "duplicate found"
                );
                report.duplicates.push(Duplicate {
                    path: path.clone(),
                    original: stripped,
                    pattern,
                });
            } else {
                tracing::debug!(orphan = %file_name, %pattern, "orphaned duplicate found");
                report.orphans.push(Orphan {
                    path: path.clone(),
                    pattern,
                    stripped,
                });
            }
        }

        tracing::debug!(
            duplicates = report.duplicates.len(),
            orphans = report.orphans.len(),
            "duplicate scan complete"
        );
        report
    }
}

impl Default for DuplicateMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Joins the text around a removed tag, collapsing the whitespace it leaves.
fn join_around(before: &str, after: &str) -> String {
    let before = before.trim_end();
    let trimmed_after = after.trim_start();
    if before.is_empty()
        || trimmed_after.len() == after.len()
        || trimmed_after.is_empty()
        || trimmed_after.starts_with('.')
    {
        format!("{}{}", before, trimmed_after)
    } else {
        format!("{} {}", before, trimmed_after)
    }
}
