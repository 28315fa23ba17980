use crate::changelog::Changelog;
use crate::files::FileManifest;

/// Structured view of one RPM spec document.
///
/// Produced by [`SpecMetadata::parse`], updated in place by
/// [`SpecMetadata::update_to`] and turned back into text by
/// [`SpecMetadata::render`]. The original document is kept verbatim so that
/// rendering only touches the spans that changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMetadata {
    /// Gem name, from `%global gem_name` or the `Name:` field.
    pub gem_name: Option<String>,

    /// Package version (`Version:`).
    pub version: Option<String>,

    /// Package release (`Release:`).
    pub release: Option<String>,

    /// Main package `Requires:` values, in document order.
    pub requires: Vec<String>,

    /// Main package `BuildRequires:` values, in document order.
    pub build_requires: Vec<String>,

    /// `%files` entries per subpackage, with file macros stripped.
    pub files: FileManifest,

    /// Files to add to the main `%files` section.
    ///
    /// Empty until [`SpecMetadata::reconcile_files`] runs.
    pub new_files: Vec<String>,

    /// `%changelog` entries, newest first.
    pub changelog: Changelog,

    pub(crate) raw_text: String,
}

impl SpecMetadata {
    /// The document this metadata was parsed from.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Look up a scalar field by its name.
    ///
    /// Recognised keys are `gem_name`, `version` and `release`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rpmspec_sync::SpecMetadata;
    ///
    /// let spec = SpecMetadata::parse("%global gem_name rake\nVersion: 13.0.6\n");
    /// assert_eq!(spec.get("gem_name"), Some("rake"));
    /// assert_eq!(spec.get("version"), Some("13.0.6"));
    /// assert_eq!(spec.get("release"), None);
    /// assert_eq!(spec.get("license"), None);
    /// ```
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "gem_name" => self.gem_name.as_deref(),
            "version" => self.version.as_deref(),
            "release" => self.release.as_deref(),
            _ => None,
        }
    }
}
