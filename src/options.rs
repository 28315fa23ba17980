use chrono::NaiveDate;

use crate::files::PathMacros;

/// Release assigned after a version bump: build 1, with the distribution tag.
pub const DEFAULT_RELEASE: &str = "1%{?dist}";

/// Settings for [`SpecMetadata::update_to`](crate::SpecMetadata::update_to).
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use rpmspec_sync::{PathMacros, UpdateOptions};
///
/// let options = UpdateOptions::new("Jane Doe <jane@example.com>")
///     .with_date(NaiveDate::from_ymd_opt(2013, 10, 29).unwrap())
///     .with_path_macros(PathMacros::default().with_libdir("/usr/lib/mylib"));
/// assert_eq!(options.release, "1%{?dist}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateOptions {
    /// Packager identity written in changelog headers.
    pub author: String,
    /// Release value set on update.
    pub release: String,
    /// Changelog date; today in local time when unset.
    pub date: Option<NaiveDate>,
    /// Path macro rules used for new `%files` entries.
    pub path_macros: PathMacros,
}

impl UpdateOptions {
    /// Options with the default release convention and path macros.
    pub fn new(author: impl Into<String>) -> Self {
        UpdateOptions {
            author: author.into(),
            release: DEFAULT_RELEASE.to_string(),
            date: None,
            path_macros: PathMacros::default(),
        }
    }

    /// Override the release value.
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = release.into();
        self
    }

    /// Pin the changelog date.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Replace the path macro rules.
    pub fn with_path_macros(mut self, path_macros: PathMacros) -> Self {
        self.path_macros = path_macros;
        self
    }
}
