use std::fmt;

use winnow::combinator::delimited;
use winnow::prelude::*;
use winnow::token::take_while;

/// A single `Requires:`/`BuildRequires:` value, classified by its shape.
///
/// Library-derived requirements are exactly `rubygem(<name>)`; everything
/// else (system packages, virtual provides, versioned gem requirements) is
/// native and kept verbatim.
///
/// # Examples
///
/// ```
/// use rpmspec_sync::Requirement;
///
/// assert_eq!(Requirement::classify("rubygem(rake)"), Requirement::Gem("rake"));
/// assert_eq!(Requirement::classify("ruby(release)"), Requirement::Native("ruby(release)"));
/// assert_eq!(Requirement::gem("rack").to_string(), "rubygem(rack)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement<'a> {
    /// Native requirement string, preserved as written.
    Native(&'a str),
    /// `rubygem(<name>)`, holding the gem name.
    Gem(&'a str),
}

impl<'a> Requirement<'a> {
    /// Classify a requirement value.
    pub fn classify(entry: &'a str) -> Requirement<'a> {
        gem_wrapper
            .parse(entry.trim())
            .map(Requirement::Gem)
            .unwrap_or(Requirement::Native(entry))
    }

    /// Library-derived requirement for the given gem name.
    pub fn gem(name: &'a str) -> Requirement<'a> {
        Requirement::Gem(name)
    }

    /// The embedded gem name, if library-derived.
    pub fn gem_name(&self) -> Option<&'a str> {
        match self {
            Requirement::Gem(name) => Some(name),
            Requirement::Native(_) => None,
        }
    }
}

impl fmt::Display for Requirement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Requirement::Native(entry) => f.write_str(entry),
            Requirement::Gem(name) => write!(f, "rubygem({name})"),
        }
    }
}

fn is_gem_name_char(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')'
}

fn gem_wrapper<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    delimited("rubygem(", take_while(1.., is_gem_name_char), ')').parse_next(input)
}

/// Ordered set of dependency names.
///
/// Insertion order is kept; inserting a name twice is a no-op.
///
/// # Examples
///
/// ```
/// use rpmspec_sync::DepSet;
///
/// let deps: DepSet = ["rack", "rake", "rack"].into_iter().collect();
/// assert_eq!(deps.len(), 2);
/// assert!(deps.contains("rake"));
/// assert_eq!(deps.iter().collect::<Vec<_>>(), vec!["rack", "rake"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DepSet {
    names: Vec<String>,
}

impl DepSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name. Returns `false` if it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Whether `name` is in the set.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Names in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for DepSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = DepSet::new();
        set.extend(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for DepSet {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        for name in iter {
            self.insert(name);
        }
    }
}
