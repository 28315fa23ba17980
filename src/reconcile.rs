use std::borrow::Cow;

use tracing::{debug, warn};

use crate::files::PathMacros;
use crate::metadata::SpecMetadata;
use crate::options::UpdateOptions;
use crate::requirement::{DepSet, Requirement};
use crate::source::NewSource;

impl SpecMetadata {
    /// Reconcile this spec with a new upstream release.
    ///
    /// Runs [`reconcile_deps`](Self::reconcile_deps),
    /// [`reconcile_files`](Self::reconcile_files) and
    /// [`add_changelog_entry`](Self::add_changelog_entry) in that order.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use rpmspec_sync::{NewSource, SpecMetadata, UpdateOptions};
    ///
    /// let mut spec = SpecMetadata::parse("Version: 1.0.0\nRequires: foo\nRequires: rubygem(bar)\n");
    /// let source = NewSource::new("2.0.0").with_deps(["bar", "baz"]);
    /// let options = UpdateOptions::new("Jane Doe <jane@example.com>")
    ///     .with_date(NaiveDate::from_ymd_opt(2013, 10, 29).unwrap());
    ///
    /// spec.update_to(&source, &options);
    /// assert_eq!(spec.requires, vec!["foo", "rubygem(bar)", "rubygem(baz)"]);
    /// assert_eq!(spec.version.as_deref(), Some("2.0.0"));
    /// ```
    pub fn update_to(&mut self, source: &NewSource, options: &UpdateOptions) {
        self.reconcile_deps(source);
        self.reconcile_files(source, &options.path_macros);
        self.add_changelog_entry(source, options);
    }

    /// Merge `Requires:` with the source's runtime dependencies and
    /// `BuildRequires:` with its development dependencies.
    ///
    /// See [`reconcile_requirements`] for the merge rule.
    pub fn reconcile_deps(&mut self, source: &NewSource) {
        self.requires = reconcile_requirements(&self.requires, &source.deps);
        self.build_requires = reconcile_requirements(&self.build_requires, &source.dev_deps);
        debug!(
            requires = self.requires.len(),
            build_requires = self.build_requires.len(),
            "reconciled dependencies"
        );
    }

    /// Compute [`SpecMetadata::new_files`]: source files no existing
    /// `%files` entry covers, expressed with `macros`.
    ///
    /// Source paths without a leading `/` are taken relative to the gem
    /// install root, like `lib/rake.rb`.
    pub fn reconcile_files(&mut self, source: &NewSource, macros: &PathMacros) {
        let mut new_files: Vec<String> = Vec::new();
        for file in source.files.iter().filter(|f| !f.is_empty()) {
            let file = rooted(file);
            if self.files.covers(&file) {
                continue;
            }
            let entry = macros.rpmize(&file);
            if !new_files.contains(&entry) {
                new_files.push(entry);
            }
        }
        debug!(
            source_files = source.files.len(),
            new_files = new_files.len(),
            "reconciled files"
        );
        self.new_files = new_files;
    }
}

fn rooted(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    }
}

/// Merge existing requirement values with the current dependency names.
///
/// The result keeps every native entry in its original order, then the
/// `rubygem(..)` entries naming gems `current` no longer declares (once per
/// name), then one `rubygem(<name>)` per current dependency in its order.
///
/// # Examples
///
/// ```
/// use rpmspec_sync::{reconcile_requirements, DepSet};
///
/// let existing = vec![
///     "rubygem(old)".to_string(),
///     "ruby(release)".to_string(),
///     "rubygem(rack)".to_string(),
/// ];
/// let current: DepSet = ["rack", "tilt"].into_iter().collect();
/// assert_eq!(
///     reconcile_requirements(&existing, &current),
///     vec!["ruby(release)", "rubygem(old)", "rubygem(rack)", "rubygem(tilt)"]
/// );
/// ```
pub fn reconcile_requirements(existing: &[String], current: &DepSet) -> Vec<String> {
    let mut native = Vec::new();
    let mut legacy: Vec<(&str, &String)> = Vec::new();

    for entry in existing {
        match Requirement::classify(entry) {
            Requirement::Native(_) => native.push(entry.clone()),
            Requirement::Gem(name) if !current.contains(name) => {
                if legacy.iter().all(|(seen, _)| *seen != name) {
                    warn!(requirement = %entry, "keeping gem requirement the new source does not declare");
                    legacy.push((name, entry));
                }
            }
            Requirement::Gem(_) => {}
        }
    }

    native
        .into_iter()
        .chain(legacy.into_iter().map(|(_, entry)| entry.clone()))
        .chain(current.iter().map(|name| Requirement::gem(name).to_string()))
        .collect()
}
