/// File lists of a spec document, keyed by subpackage.
///
/// The main package is keyed by `None`. Keys keep the order in which their
/// `%files` sections appear in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileManifest {
    sections: Vec<(Option<String>, Vec<String>)>,
}

impl FileManifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Files of the given subpackage (`None` for the main package).
    pub fn get(&self, subpackage: Option<&str>) -> Option<&[String]> {
        self.sections
            .iter()
            .find(|(key, _)| key.as_deref() == subpackage)
            .map(|(_, files)| files.as_slice())
    }

    /// Files of the main package.
    pub fn main(&self) -> Option<&[String]> {
        self.get(None)
    }

    /// Subpackage keys in document order.
    pub fn subpackages(&self) -> impl Iterator<Item = Option<&str>> {
        self.sections.iter().map(|(key, _)| key.as_deref())
    }

    /// Iterate `(subpackage, files)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &[String])> {
        self.sections
            .iter()
            .map(|(key, files)| (key.as_deref(), files.as_slice()))
    }

    /// Every file entry across all subpackages.
    pub fn all_files(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|(_, files)| files.iter().map(String::as_str))
    }

    /// Whether an existing entry is contained in `path`.
    ///
    /// Entries are matched as substrings, so a directory entry covers every
    /// file below it. Empty entries cover nothing.
    pub fn covers(&self, path: &str) -> bool {
        self.all_files()
            .any(|entry| !entry.is_empty() && path.contains(entry))
    }

    /// Register a section, keeping its first position if already known.
    pub(crate) fn open_section(&mut self, subpackage: Option<&str>) {
        if self.get(subpackage).is_none() {
            self.sections
                .push((subpackage.map(str::to_string), Vec::new()));
        }
    }

    /// Append a file to a section, registering it if needed.
    pub fn push(&mut self, subpackage: Option<&str>, file: impl Into<String>) {
        self.open_section(subpackage);
        if let Some((_, files)) = self
            .sections
            .iter_mut()
            .find(|(key, _)| key.as_deref() == subpackage)
        {
            files.push(file.into());
        }
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether no `%files` section was seen.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Prefix markers removed from `%files` lines, in application order.
///
/// `%docdir` and `%defattr` consume the whole line.
const FILE_MACROS: &[(&str, MacroArgs)] = &[
    ("%doc", MacroArgs::None),
    ("%license", MacroArgs::None),
    ("%config", MacroArgs::Optional),
    ("%attr", MacroArgs::Optional),
    ("%verify", MacroArgs::Optional),
    ("%docdir", MacroArgs::Line),
    ("%dir", MacroArgs::None),
    ("%defattr", MacroArgs::Line),
    ("%exclude", MacroArgs::None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MacroArgs {
    /// `%macro <path>`.
    None,
    /// `%macro <path>` or `%macro(args) <path>`.
    Optional,
    /// Rest of the line belongs to the macro.
    Line,
}

/// Translation rules between RPM path macros and literal gem paths.
///
/// The parser strips file macros and turns known path macros into literal
/// directory fragments so entries can be compared with the paths a gem
/// installs; [`PathMacros::rpmize`] does the reverse for new files.
///
/// # Examples
///
/// ```
/// use rpmspec_sync::PathMacros;
///
/// let macros = PathMacros::default();
/// assert_eq!(macros.strip("%doc %{gem_instdir}/README.md"), "/README.md");
/// assert_eq!(macros.strip("%{gem_libdir}"), "/lib");
/// assert_eq!(macros.rpmize("/lib/rake.rb"), "%{gem_libdir}/rake.rb");
/// assert_eq!(macros.rpmize("/Rakefile"), "%{gem_instdir}/Rakefile");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathMacros {
    /// Install-root token, stripped from entries and prepended to new files
    /// no substitution applies to.
    pub install_dir: String,
    /// `(macro, literal)` pairs, e.g. `("%{gem_libdir}", "/lib")`.
    pub substitutions: Vec<(String, String)>,
}

/// Binary directory macro.
pub const BINDIR_MACRO: &str = "%{_bindir}";
/// Gem library directory macro.
pub const LIBDIR_MACRO: &str = "%{gem_libdir}";
/// Gem install directory macro.
pub const INSTDIR_MACRO: &str = "%{gem_instdir}";

impl Default for PathMacros {
    fn default() -> Self {
        PathMacros {
            install_dir: INSTDIR_MACRO.to_string(),
            substitutions: vec![
                (BINDIR_MACRO.to_string(), "/bin".to_string()),
                (LIBDIR_MACRO.to_string(), "/lib".to_string()),
            ],
        }
    }
}

impl PathMacros {
    /// Set the literal directory for `macro_name`, adding the rule if absent.
    pub fn with_substitution(mut self, macro_name: &str, literal: &str) -> Self {
        match self.substitutions.iter_mut().find(|(m, _)| m == macro_name) {
            Some((_, lit)) => *lit = literal.to_string(),
            None => self
                .substitutions
                .push((macro_name.to_string(), literal.to_string())),
        }
        self
    }

    /// Set the literal for `%{gem_libdir}`.
    pub fn with_libdir(self, literal: &str) -> Self {
        self.with_substitution(LIBDIR_MACRO, literal)
    }

    /// Set the literal for `%{_bindir}`.
    pub fn with_bindir(self, literal: &str) -> Self {
        self.with_substitution(BINDIR_MACRO, literal)
    }

    /// Reduce a `%files` line to a comparable path.
    ///
    /// Returns an empty string for lines that carry no path (blank lines,
    /// `%defattr(...)`, bare `%{gem_instdir}`).
    pub fn strip(&self, line: &str) -> String {
        let mut rest = line.trim();
        for (name, args) in FILE_MACROS {
            rest = strip_file_macro(rest, name, *args).trim_start();
        }
        if let Some(path) = rest.strip_prefix(self.install_dir.as_str()) {
            rest = path;
        }

        let mut path = rest.to_string();
        for (macro_name, literal) in &self.substitutions {
            path = path.replace(macro_name.as_str(), literal);
        }
        path.trim().to_string()
    }

    /// Express a gem path with RPM macros.
    ///
    /// A path under one of the substitution literals gets that macro as
    /// prefix; anything else is placed under the install-root token.
    pub fn rpmize(&self, path: &str) -> String {
        for (macro_name, literal) in &self.substitutions {
            if let Some(tail) = path.strip_prefix(literal.as_str()) {
                if tail.is_empty() || tail.starts_with('/') {
                    return format!("{macro_name}{tail}");
                }
            }
        }
        if path.starts_with('/') {
            format!("{}{path}", self.install_dir)
        } else {
            format!("{}/{path}", self.install_dir)
        }
    }
}

fn strip_file_macro<'a>(line: &'a str, name: &str, args: MacroArgs) -> &'a str {
    let Some(after) = line.strip_prefix(name) else {
        return line;
    };
    match args {
        MacroArgs::Line => "",
        MacroArgs::Optional if after.starts_with('(') => match after.find(')') {
            Some(close) => &after[close + 1..],
            None => line,
        },
        MacroArgs::None | MacroArgs::Optional => {
            if after.starts_with(char::is_whitespace) {
                after
            } else {
                line
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_simple_macros() {
        let macros = PathMacros::default();
        assert_eq!(macros.strip("%doc README"), "README");
        assert_eq!(macros.strip("%license LICENSE"), "LICENSE");
        assert_eq!(macros.strip("%dir %{gem_instdir}/data"), "/data");
        assert_eq!(macros.strip("%exclude %{gem_cache}"), "%{gem_cache}");
        assert_eq!(macros.strip("%config /etc/foo.conf"), "/etc/foo.conf");
    }

    #[test]
    fn strip_macros_with_arguments() {
        let macros = PathMacros::default();
        assert_eq!(
            macros.strip("%config(noreplace) %{_sysconfdir}/foo.conf"),
            "%{_sysconfdir}/foo.conf"
        );
        assert_eq!(
            macros.strip("%attr(0755,root,root) %{_bindir}/rake"),
            "/bin/rake"
        );
        assert_eq!(macros.strip("%verify(not md5) /var/log/x"), "/var/log/x");
    }

    #[test]
    fn strip_whole_line_macros() {
        let macros = PathMacros::default();
        assert_eq!(macros.strip("%defattr(-,root,root,-)"), "");
        assert_eq!(macros.strip("%docdir %{gem_docdir}"), "");
    }

    #[test]
    fn strip_install_dir() {
        let macros = PathMacros::default();
        assert_eq!(macros.strip("%{gem_instdir}"), "");
        assert_eq!(macros.strip("%dir %{gem_instdir}"), "");
        assert_eq!(macros.strip("%doc %{gem_instdir}/README"), "/README");
        assert_eq!(macros.strip("  %{gem_libdir}  "), "/lib");
    }

    #[test]
    fn strip_requires_word_boundary() {
        let macros = PathMacros::default();
        assert_eq!(macros.strip("%docs/foo"), "%docs/foo");
        assert_eq!(macros.strip("%directory"), "%directory");
    }

    #[test]
    fn rpmize_substitutions() {
        let macros = PathMacros::default();
        assert_eq!(macros.rpmize("/bin/rake"), "%{_bindir}/rake");
        assert_eq!(macros.rpmize("/lib"), "%{gem_libdir}");
        assert_eq!(macros.rpmize("/library/x"), "%{gem_instdir}/library/x");
        assert_eq!(macros.rpmize("README.md"), "%{gem_instdir}/README.md");
    }

    #[test]
    fn configured_libdir() {
        let macros = PathMacros::default().with_libdir("/usr/lib/mylib");
        assert_eq!(macros.rpmize("/usr/lib/mylib/bar.rb"), "%{gem_libdir}/bar.rb");
        assert_eq!(macros.strip("%{gem_libdir}/foo.rb"), "/usr/lib/mylib/foo.rb");
        assert_eq!(macros.substitutions.len(), 2);
    }

    #[test]
    fn custom_substitution() {
        let macros = PathMacros::default().with_substitution("%{gem_extdir_mri}", "/ext");
        assert_eq!(macros.substitutions.len(), 3);
        assert_eq!(macros.rpmize("/ext/foo.so"), "%{gem_extdir_mri}/foo.so");
    }

    #[test]
    fn manifest_keeps_section_order() {
        let mut manifest = FileManifest::new();
        manifest.open_section(None);
        manifest.push(Some("doc"), "/README");
        manifest.push(None, "/lib");
        manifest.push(Some("doc"), "/CHANGELOG");
        assert_eq!(
            manifest.subpackages().collect::<Vec<_>>(),
            vec![None, Some("doc")]
        );
        assert_eq!(manifest.main().unwrap(), &["/lib".to_string()]);
        assert_eq!(manifest.get(Some("doc")).unwrap().len(), 2);
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn manifest_covers_by_substring() {
        let mut manifest = FileManifest::new();
        manifest.push(None, "/lib");
        manifest.push(Some("doc"), "/README.md");
        assert!(manifest.covers("/lib/rake/task.rb"));
        assert!(manifest.covers("/README.md"));
        assert!(!manifest.covers("/Rakefile"));
        assert!(!FileManifest::new().covers("/lib"));
    }

    #[test]
    fn empty_entry_covers_nothing() {
        let mut manifest = FileManifest::new();
        manifest.push(None, "");
        assert!(!manifest.covers("/lib/rake.rb"));
        assert!(!manifest.covers(""));
    }
}
