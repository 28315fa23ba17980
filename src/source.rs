use crate::gemfile::Gemfile;
use crate::requirement::DepSet;

/// The upstream state a spec document is reconciled against.
///
/// # Examples
///
/// ```
/// use rpmspec_sync::NewSource;
///
/// let source = NewSource::new("2.0.0")
///     .with_deps(["rack", "tilt"])
///     .with_dev_deps(["minitest"])
///     .with_files(["/lib/sinatra.rb", "/README.md"]);
/// assert_eq!(source.deps.len(), 2);
/// assert!(source.dev_deps.contains("minitest"));
/// assert_eq!(source.files.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewSource {
    /// Released version.
    pub version: String,
    /// Runtime dependency names, matched against `Requires:`.
    pub deps: DepSet,
    /// Development dependency names, matched against `BuildRequires:`.
    pub dev_deps: DepSet,
    /// Installed paths relative to the gem install root, with a leading `/`.
    pub files: Vec<String>,
}

impl NewSource {
    /// A source with the given version and nothing else.
    pub fn new(version: impl Into<String>) -> Self {
        NewSource {
            version: version.into(),
            ..Default::default()
        }
    }

    /// Dependencies and development dependencies declared by a Gemfile.
    pub fn from_gemfile(version: impl Into<String>, gemfile: &Gemfile) -> Self {
        NewSource {
            version: version.into(),
            deps: gemfile.deps(),
            dev_deps: gemfile.dev_deps(),
            files: Vec::new(),
        }
    }

    /// Set runtime dependencies.
    pub fn with_deps<S: Into<String>>(mut self, deps: impl IntoIterator<Item = S>) -> Self {
        self.deps = deps.into_iter().collect();
        self
    }

    /// Set development dependencies.
    pub fn with_dev_deps<S: Into<String>>(mut self, deps: impl IntoIterator<Item = S>) -> Self {
        self.dev_deps = deps.into_iter().collect();
        self
    }

    /// Set installed files.
    pub fn with_files<S: Into<String>>(mut self, files: impl IntoIterator<Item = S>) -> Self {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }
}
