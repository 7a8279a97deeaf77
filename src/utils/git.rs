//! Git queries for the static site generator.
//!
//! Git is the source of truth twice over: tracked-file listing drives content
//! discovery (respecting ignore rules), and per-file revision history supplies
//! creation and last-modified dates.

use crate::exec;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};

// ============================================================================
// Tracked Entries
// ============================================================================

/// A tracked entry directly under a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedEntry {
    /// A tracked file at depth one.
    File(PathBuf),
    /// A directory containing tracked files deeper down.
    Dir(PathBuf),
}

/// List tracked entries directly under `dir`, in listing order.
///
/// `git ls-files` reports tracked files recursively; depth-one entries are
/// derived from it: a path without a separator is a file, anything deeper
/// collapses into its first component as a directory (deduplicated).
pub fn list_tracked(dir: &Path) -> Result<Vec<TrackedEntry>> {
    let output = exec!(dir; ["git"]; "ls-files")?;
    let stdout = String::from_utf8(output.stdout).context("Invalid UTF-8 in git ls-files output")?;

    let mut entries = Vec::new();
    for line in stdout.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let entry = match line.split_once('/') {
            None => TrackedEntry::File(PathBuf::from(line)),
            Some((first, _)) => TrackedEntry::Dir(PathBuf::from(first)),
        };
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

// ============================================================================
// Revision Dates
// ============================================================================

/// Creation and last-modified timestamps derived from a file's history.
#[derive(Debug, Clone, Copy)]
pub struct RevisionDates {
    /// Oldest recorded revision, full precision.
    pub creation: DateTime<FixedOffset>,
    /// Newest recorded revision, full precision.
    pub last_modified: DateTime<FixedOffset>,
}

impl RevisionDates {
    /// Creation date at calendar-day precision.
    pub fn creation_ymd(&self) -> String {
        self.creation.format("%Y-%m-%d").to_string()
    }

    /// Last-modified date at calendar-day precision.
    pub fn last_modified_ymd(&self) -> String {
        self.last_modified.format("%Y-%m-%d").to_string()
    }
}

/// Derive revision dates for one tracked file.
///
/// Runs `git log --format=%aD` for the file and parses every author date
/// as RFC 2822. Log order is not trusted: timestamps are compared
/// explicitly, so a rebased or imported history still yields
/// `creation <= last_modified`.
///
/// A file with no recorded history is a fatal misconfiguration.
pub fn revision_dates(file: &Path) -> Result<RevisionDates> {
    let dir = file.parent().context("File has no parent directory")?;
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("Invalid file name")?;

    let output = exec!(dir; ["git"]; "log", "--format=%aD", "--", name)?;
    let stdout = String::from_utf8(output.stdout).context("Invalid UTF-8 in git log output")?;

    let mut dates = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let date = DateTime::parse_from_rfc2822(line)
            .with_context(|| format!("Unparseable revision date `{line}` for {}", file.display()))?;
        dates.push(date);
    }

    dates_to_range(&dates, file)
}

/// Pick the oldest and newest timestamps of a revision list.
fn dates_to_range(dates: &[DateTime<FixedOffset>], file: &Path) -> Result<RevisionDates> {
    let (first, rest) = match dates.split_first() {
        Some(split) => split,
        None => bail!(
            "{} has no revision history; commit it before building",
            file.display()
        ),
    };

    let mut creation = *first;
    let mut last_modified = *first;
    for date in rest {
        if date < &creation {
            creation = *date;
        }
        if date > &last_modified {
            last_modified = *date;
        }
    }

    Ok(RevisionDates {
        creation,
        last_modified,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rfc2822(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc2822(s).unwrap()
    }

    #[test]
    fn test_dates_to_range_newest_first() {
        let dates = vec![
            rfc2822("Tue, 02 Jan 2024 10:00:00 +0000"),
            rfc2822("Mon, 01 Jan 2024 10:00:00 +0000"),
        ];
        let range = dates_to_range(&dates, Path::new("a.org")).unwrap();
        assert_eq!(range.creation_ymd(), "2024-01-01");
        assert_eq!(range.last_modified_ymd(), "2024-01-02");
    }

    #[test]
    fn test_dates_to_range_unordered_history() {
        // Log order is not trusted; min/max are picked explicitly
        let dates = vec![
            rfc2822("Mon, 01 Jan 2024 10:00:00 +0000"),
            rfc2822("Wed, 03 Jan 2024 10:00:00 +0000"),
            rfc2822("Tue, 02 Jan 2024 10:00:00 +0000"),
        ];
        let range = dates_to_range(&dates, Path::new("a.org")).unwrap();
        assert_eq!(range.creation_ymd(), "2024-01-01");
        assert_eq!(range.last_modified_ymd(), "2024-01-03");
    }

    #[test]
    fn test_dates_to_range_single_revision() {
        let dates = vec![rfc2822("Mon, 01 Jan 2024 10:00:00 +0000")];
        let range = dates_to_range(&dates, Path::new("a.org")).unwrap();
        assert_eq!(range.creation, range.last_modified);
    }

    #[test]
    fn test_dates_to_range_empty_is_fatal() {
        let result = dates_to_range(&[], Path::new("notes/a.org"));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("notes/a.org"));
        assert!(err.contains("no revision history"));
    }

    #[test]
    fn test_creation_not_after_last_modified() {
        let dates = vec![
            rfc2822("Fri, 05 Jan 2024 23:59:59 +0900"),
            rfc2822("Fri, 05 Jan 2024 00:00:01 -0500"),
        ];
        let range = dates_to_range(&dates, Path::new("a.org")).unwrap();
        assert!(range.creation <= range.last_modified);
    }
}
