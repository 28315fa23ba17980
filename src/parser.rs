use tracing::debug;

use crate::changelog::Changelog;
use crate::directive::Directive;
use crate::files::{FileManifest, PathMacros};
use crate::metadata::SpecMetadata;

/// Where the scan currently is in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState<'a> {
    Normal,
    InChangelog,
    /// Inside a `%files` section; `None` targets the main package.
    InFiles(Option<&'a str>),
}

impl SpecMetadata {
    /// Parse a spec document with the default [`PathMacros`].
    ///
    /// Parsing never fails: lines that match no known marker are ignored and
    /// missing fields stay unset or empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use rpmspec_sync::SpecMetadata;
    ///
    /// let input = "\
    /// %global gem_name rake
    /// Name: rubygem-%{gem_name}
    /// Version: 10.0.3
    /// Release: 1%{?dist}
    /// Requires: ruby(release)
    /// BuildRequires: rubygem(minitest)
    ///
    /// %files
    /// %{gem_libdir}
    ///
    /// %changelog
    /// * Tue Jan 01 2013 Jane Doe <jane@example.com> - 10.0.3-1
    /// - Initial package
    /// ";
    /// let spec = SpecMetadata::parse(input);
    /// assert_eq!(spec.gem_name.as_deref(), Some("rake"));
    /// assert_eq!(spec.requires, vec!["ruby(release)"]);
    /// assert_eq!(spec.files.main().unwrap(), &["/lib".to_string()]);
    /// assert_eq!(spec.changelog.len(), 1);
    /// ```
    pub fn parse(input: &str) -> SpecMetadata {
        Self::parse_with(input, &PathMacros::default())
    }

    /// Parse a spec document, stripping `%files` entries with `macros`.
    pub fn parse_with(input: &str, macros: &PathMacros) -> SpecMetadata {
        let mut state = ScanState::Normal;
        let mut in_subpackage = false;

        let mut gem_name = None;
        let mut version = None;
        let mut release = None;
        let mut requires = Vec::new();
        let mut build_requires = Vec::new();
        let mut files = FileManifest::new();
        let mut changelog_text = String::new();

        for raw in input.split_inclusive('\n') {
            let line = raw.trim_end_matches(['\n', '\r']);

            match Directive::classify(line) {
                Directive::Comment => {}
                Directive::GemName(name) => gem_name = non_empty(name),
                Directive::Name(value) => {
                    let name = value.strip_prefix("rubygem-").unwrap_or(value);
                    if !is_macro_reference(name) {
                        gem_name = non_empty(name).or(gem_name);
                    }
                }
                Directive::Version(value) => {
                    if version.is_none() {
                        version = non_empty(value);
                    }
                }
                Directive::Release(value) => {
                    if release.is_none() {
                        release = non_empty(value);
                    }
                }
                Directive::Package(name) => {
                    debug!(subpackage = name, "subpackage header");
                    in_subpackage = true;
                }
                Directive::Requires(value) if !in_subpackage => requires.push(value.to_string()),
                Directive::BuildRequires(value) if !in_subpackage => {
                    build_requires.push(value.to_string())
                }
                Directive::Changelog => state = ScanState::InChangelog,
                Directive::Files(target) => {
                    files.open_section(target);
                    state = ScanState::InFiles(target);
                }
                _ => match state {
                    ScanState::Normal => {}
                    ScanState::InChangelog => changelog_text.push_str(raw),
                    ScanState::InFiles(target) => {
                        let path = macros.strip(line);
                        if !path.is_empty() {
                            files.push(target, path);
                        }
                    }
                },
            }
        }

        let changelog = Changelog::parse(&changelog_text);
        debug!(
            gem_name = gem_name.as_deref().unwrap_or(""),
            requires = requires.len(),
            build_requires = build_requires.len(),
            file_sections = files.len(),
            changelog_entries = changelog.len(),
            "parsed spec"
        );

        SpecMetadata {
            gem_name,
            version,
            release,
            requires,
            build_requires,
            files,
            new_files: Vec::new(),
            changelog,
            raw_text: input.to_string(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// `%{...}` or `%name`, with nothing around it.
fn is_macro_reference(value: &str) -> bool {
    if let Some(inner) = value.strip_prefix("%{") {
        return inner.find('}').is_some_and(|close| close + 1 == inner.len());
    }
    match value.strip_prefix('%') {
        Some(name) => !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_'),
        None => false,
    }
}
