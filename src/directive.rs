use std::ops::Range;

use winnow::ascii::{space0, space1};
use winnow::combinator::{alt, eof, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::rest;

/// Classification of a single spec document line.
///
/// Lines are matched against the marker patterns in a fixed precedence order;
/// the first match wins. Values are trimmed slices of the input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Directive<'a> {
    /// `# ...`, optionally indented.
    Comment,
    /// `%global gem_name <name>`.
    GemName(&'a str),
    /// `Name: <pkg>`.
    Name(&'a str),
    /// `Version: <v>`.
    Version(&'a str),
    /// `Release: <r>`.
    Release(&'a str),
    /// `%package <sub>`.
    Package(&'a str),
    /// `Requires: <r>`.
    Requires(&'a str),
    /// `BuildRequires: <r>`.
    BuildRequires(&'a str),
    /// `%changelog`.
    Changelog,
    /// `%files` (`None`) or `%files <sub>`.
    Files(Option<&'a str>),
    /// Anything else.
    Other,
}

impl<'a> Directive<'a> {
    /// Classify a line. The line must not include its terminator.
    pub(crate) fn classify(line: &'a str) -> Directive<'a> {
        let mut input = line;
        parse_directive(&mut input).unwrap_or(Directive::Other)
    }

    /// Whether this line opens a `%files` section, main or subpackage.
    pub(crate) fn is_files(&self) -> bool {
        matches!(self, Directive::Files(_))
    }

    /// Whether this is a subpackage `%files <sub>` marker.
    pub(crate) fn is_subpackage_files(&self) -> bool {
        matches!(self, Directive::Files(Some(_)))
    }

    /// Whether this is a `Requires:` or `BuildRequires:` line.
    pub(crate) fn is_requirement(&self) -> bool {
        matches!(self, Directive::Requires(_) | Directive::BuildRequires(_))
    }

    /// Tag and value of a `Requires:` or `BuildRequires:` line.
    pub(crate) fn requirement(&self) -> Option<(&'static str, &'a str)> {
        match *self {
            Directive::Requires(value) => Some(("Requires", value)),
            Directive::BuildRequires(value) => Some(("BuildRequires", value)),
            _ => None,
        }
    }
}

/// Byte range of the value of a `Tag: value` line, excluding surrounding
/// whitespace. `tag` must be the ASCII tag the line was classified with.
pub(crate) fn field_value_range(line: &str, tag: &str) -> Range<usize> {
    let after = &line[tag.len() + 1..];
    let start = line.len() - after.trim_start().len();
    let end = start.max(line.trim_end().len());
    start..end
}

// Winnow parsers

fn field<'s>(tag: &'static str) -> impl Parser<&'s str, &'s str, ErrMode<ContextError>> {
    preceded((tag, ':', space0), rest).map(|value: &'s str| value.trim())
}

fn gem_name_macro<'s>(input: &mut &'s str) -> ModalResult<Directive<'s>> {
    preceded(("%global", space0, "gem_name", space1), rest)
        .map(|name: &'s str| Directive::GemName(name.trim()))
        .parse_next(input)
}

fn package_header<'s>(input: &mut &'s str) -> ModalResult<Directive<'s>> {
    preceded(("%package", space1), rest)
        .map(|name: &'s str| Directive::Package(name.trim()))
        .parse_next(input)
}

fn files_marker<'s>(input: &mut &'s str) -> ModalResult<Directive<'s>> {
    preceded(
        "%files",
        alt((
            (space0, eof).map(|_| None),
            preceded(space1, rest).map(|sub: &'s str| Some(sub.trim())),
        )),
    )
    .map(Directive::Files)
    .parse_next(input)
}

fn parse_directive<'s>(input: &mut &'s str) -> ModalResult<Directive<'s>> {
    alt((
        (space0, '#').map(|_| Directive::Comment),
        gem_name_macro,
        field("Name").map(Directive::Name),
        field("Version").map(Directive::Version),
        field("Release").map(Directive::Release),
        package_header,
        field("Requires").map(Directive::Requires),
        field("BuildRequires").map(Directive::BuildRequires),
        ("%changelog", space0, eof).map(|_| Directive::Changelog),
        files_marker,
    ))
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_wins_over_markers() {
        assert_eq!(Directive::classify("# Requires: foo"), Directive::Comment);
        assert_eq!(Directive::classify("   #%changelog"), Directive::Comment);
        assert_eq!(Directive::classify("\t# Version: 1"), Directive::Comment);
    }

    #[test]
    fn gem_name_macro() {
        assert_eq!(
            Directive::classify("%global gem_name rake"),
            Directive::GemName("rake")
        );
        assert_eq!(
            Directive::classify("%global  gem_name\tactivesupport "),
            Directive::GemName("activesupport")
        );
        assert_eq!(Directive::classify("%global gem_name"), Directive::Other);
    }

    #[test]
    fn fields() {
        assert_eq!(
            Directive::classify("Name: rubygem-rake"),
            Directive::Name("rubygem-rake")
        );
        assert_eq!(
            Directive::classify("Version:\t1.2.3  "),
            Directive::Version("1.2.3")
        );
        assert_eq!(
            Directive::classify("Release: 1%{?dist}"),
            Directive::Release("1%{?dist}")
        );
        assert_eq!(
            Directive::classify("Requires: ruby(release)"),
            Directive::Requires("ruby(release)")
        );
        assert_eq!(
            Directive::classify("BuildRequires:rubygems-devel"),
            Directive::BuildRequires("rubygems-devel")
        );
    }

    #[test]
    fn markers_are_anchored_and_case_sensitive() {
        assert_eq!(Directive::classify(" Version: 1"), Directive::Other);
        assert_eq!(Directive::classify("version: 1"), Directive::Other);
        assert_eq!(Directive::classify("Requires(post): foo"), Directive::Other);
        assert_eq!(Directive::classify("%changelogs"), Directive::Other);
        assert_eq!(Directive::classify("%filesystem"), Directive::Other);
    }

    #[test]
    fn sections() {
        assert_eq!(Directive::classify("%changelog"), Directive::Changelog);
        assert_eq!(Directive::classify("%changelog  "), Directive::Changelog);
        assert_eq!(Directive::classify("%files"), Directive::Files(None));
        assert_eq!(Directive::classify("%files "), Directive::Files(None));
        assert_eq!(
            Directive::classify("%files doc"),
            Directive::Files(Some("doc"))
        );
        assert_eq!(
            Directive::classify("%package doc"),
            Directive::Package("doc")
        );
        assert_eq!(Directive::classify("%package"), Directive::Other);
    }

    #[test]
    fn predicates() {
        assert!(Directive::Files(None).is_files());
        assert!(!Directive::Files(None).is_subpackage_files());
        assert!(Directive::Files(Some("doc")).is_subpackage_files());
        assert!(Directive::Requires("x").is_requirement());
        assert!(Directive::BuildRequires("x").is_requirement());
        assert!(!Directive::Changelog.is_requirement());
        assert_eq!(
            Directive::BuildRequires("x").requirement(),
            Some(("BuildRequires", "x"))
        );
        assert_eq!(Directive::Other.requirement(), None);
    }

    #[test]
    fn value_range() {
        let line = "Version:   1.0.0  ";
        let range = field_value_range(line, "Version");
        assert_eq!(&line[range], "1.0.0");

        let line = "Release:";
        let range = field_value_range(line, "Release");
        assert_eq!(range, 8..8);
    }
}
