use std::fmt;

use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::metadata::SpecMetadata;
use crate::options::UpdateOptions;
use crate::source::NewSource;

/// `%changelog` entries of a spec document, newest first.
///
/// Tracks how many entries were prepended since the document was parsed so
/// the renderer inserts exactly those.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changelog {
    entries: Vec<String>,
    added: usize,
}

impl Changelog {
    /// Split the body of a `%changelog` section into entries.
    ///
    /// Entries are separated by blank lines; each is trimmed and empty ones
    /// are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use rpmspec_sync::Changelog;
    ///
    /// let log = Changelog::parse("* Tue Jan 01 2013 A <a@b> - 1-1\n- New\n\n\n* Mon Dec 31 2012 A <a@b> - 0.9-1\n- Old\n");
    /// assert_eq!(log.len(), 2);
    /// assert_eq!(log.entries()[1], "* Mon Dec 31 2012 A <a@b> - 0.9-1\n- Old");
    /// ```
    pub fn parse(text: &str) -> Changelog {
        let mut entries = Vec::new();
        let mut block: Vec<&str> = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                flush_block(&mut block, &mut entries);
            } else {
                block.push(line);
            }
        }
        flush_block(&mut block, &mut entries);

        Changelog { entries, added: 0 }
    }

    /// All entries, newest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Entries prepended since parsing, newest first.
    pub fn added(&self) -> &[String] {
        &self.entries[..self.added]
    }

    /// Put an entry in front of all others.
    pub fn prepend(&mut self, entry: impl Into<String>) {
        self.entries.insert(0, entry.into());
        self.added += 1;
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn flush_block(block: &mut Vec<&str>, entries: &mut Vec<String>) {
    let entry = block.join("\n");
    let entry = entry.trim();
    if !entry.is_empty() {
        entries.push(entry.to_string());
    }
    block.clear();
}

/// A formatted `%changelog` entry.
///
/// ```
/// use chrono::NaiveDate;
/// use rpmspec_sync::ChangelogEntry;
///
/// let entry = ChangelogEntry {
///     date: NaiveDate::from_ymd_opt(2013, 10, 29).unwrap(),
///     author: "Jane Doe <jane@example.com>",
///     version: "2.0.0",
///     release: "1%{?dist}",
///     message: "Update to version 2.0.0".to_string(),
/// };
/// assert_eq!(
///     entry.to_string(),
///     "* Tue Oct 29 2013 Jane Doe <jane@example.com> - 2.0.0-1%{?dist}\n- Update to version 2.0.0"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry<'a> {
    /// Date in the header line.
    pub date: NaiveDate,
    /// Packager identity, `Name <email>`.
    pub author: &'a str,
    /// Version part of the `version-release` tag.
    pub version: &'a str,
    /// Release part of the `version-release` tag.
    pub release: &'a str,
    /// Body line, written after `- `.
    pub message: String,
}

impl fmt::Display for ChangelogEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "* {} {} - {}-{}\n- {}",
            self.date.format("%a %b %d %Y"),
            self.author,
            self.version,
            self.release,
            self.message
        )
    }
}

impl SpecMetadata {
    /// Bump version and release and record the update in the changelog.
    ///
    /// `version` becomes the source version, `release` is reset to
    /// `options.release` and a new entry dated `options.date` (today if
    /// unset) is prepended to [`SpecMetadata::changelog`].
    pub fn add_changelog_entry(&mut self, source: &NewSource, options: &UpdateOptions) {
        self.version = Some(source.version.clone());
        self.release = Some(options.release.clone());

        let date = options.date.unwrap_or_else(|| Local::now().date_naive());
        let entry = ChangelogEntry {
            date,
            author: &options.author,
            version: &source.version,
            release: &options.release,
            message: format!("Update to version {}", source.version),
        };
        debug!(version = %source.version, %date, "adding changelog entry");
        self.changelog.prepend(entry.to_string());
    }
}
