use std::ops::Range;

use tracing::debug;

use crate::directive::{field_value_range, Directive};
use crate::error::{Error, Result};
use crate::metadata::SpecMetadata;

/// One line of the original document with its byte offsets.
#[derive(Debug)]
struct Line<'a> {
    /// Offset of the first byte.
    start: usize,
    /// Offset just past the content, before the line terminator.
    end: usize,
    /// Offset of the next line.
    next: usize,
    content: &'a str,
    directive: Directive<'a>,
}

impl Line<'_> {
    fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Replacement of a byte range of the original document.
#[derive(Debug)]
struct Edit {
    range: Range<usize>,
    replacement: String,
}

impl Edit {
    fn insert(at: usize, text: String) -> Self {
        Edit {
            range: at..at,
            replacement: text,
        }
    }
}

fn scan_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for raw in text.split_inclusive('\n') {
        let content = raw.trim_end_matches(['\n', '\r']);
        lines.push(Line {
            start: offset,
            end: offset + content.len(),
            next: offset + raw.len(),
            content,
            directive: Directive::classify(content),
        });
        offset += raw.len();
    }
    lines
}

impl SpecMetadata {
    /// Render the updated document.
    ///
    /// The result is the original text with only these spans rewritten:
    ///
    /// - the value of the first `Version:` and `Release:` lines,
    /// - changelog entries added since parsing, inserted after `%changelog`,
    /// - requirement lines of the main package whose value was dropped or
    ///   added,
    /// - [`new_files`](SpecMetadata::new_files), appended to the main
    ///   `%files` section.
    ///
    /// Fails with [`Error::MalformedDocument`] when the document has no
    /// `%changelog` section, no main `%files` section or no requirement line
    /// in the main package.
    ///
    /// # Examples
    ///
    /// ```
    /// use rpmspec_sync::SpecMetadata;
    ///
    /// let input = "\
    /// Version: 1.0.0
    /// Requires: ruby
    ///
    /// %files
    /// /lib
    ///
    /// %changelog
    /// ";
    /// let mut spec = SpecMetadata::parse(input);
    /// spec.version = Some("1.1.0".to_string());
    /// spec.new_files.push("/README.md".to_string());
    ///
    /// let output = spec.render().unwrap();
    /// assert_eq!(output, input.replace("1.0.0", "1.1.0").replace("/lib\n", "/lib\n/README.md\n"));
    /// ```
    pub fn render(&self) -> Result<String> {
        let text = self.raw_text.as_str();
        let eol = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let lines = scan_lines(text);

        let changelog = lines
            .iter()
            .find(|l| l.directive == Directive::Changelog)
            .ok_or_else(|| Error::MalformedDocument("no %changelog section".to_string()))?;
        let main_files = lines
            .iter()
            .position(|l| l.directive == Directive::Files(None))
            .ok_or_else(|| Error::MalformedDocument("no main %files section".to_string()))?;

        let mut edits = self.requirements_edits(&lines, eol)?;
        if let Some(edit) = field_edit(&lines, "Version", self.version.as_deref()) {
            edits.push(edit);
        }
        if let Some(edit) = field_edit(&lines, "Release", self.release.as_deref()) {
            edits.push(edit);
        }
        if let Some(edit) = self.new_files_edit(&lines, main_files, text, eol) {
            edits.push(edit);
        }
        if let Some(edit) = self.changelog_edit(changelog, text, eol) {
            edits.push(edit);
        }

        let count = edits.len();
        let output = apply_edits(text, edits)?;
        debug!(edits = count, bytes = output.len(), "rendered spec");
        Ok(output)
    }

    /// Edit the main package requirement lines, which end before the first
    /// `%package` marker (or the first `%files` marker without one).
    ///
    /// A line whose value is still listed stays as it is, and so does every
    /// other line between them. Lines with dropped values are removed. New
    /// values go after the last kept line with the same tag.
    fn requirements_edits(&self, lines: &[Line<'_>], eol: &str) -> Result<Vec<Edit>> {
        let boundary = lines
            .iter()
            .position(|l| matches!(l.directive, Directive::Package(_)))
            .or_else(|| lines.iter().position(|l| l.directive.is_files()))
            .unwrap_or(lines.len());
        let block: Vec<&Line<'_>> = lines[..boundary]
            .iter()
            .filter(|l| l.directive.is_requirement())
            .collect();
        let first = *block.first().ok_or_else(|| {
            Error::MalformedDocument("no Requires or BuildRequires in main package".to_string())
        })?;

        let mut missing_requires: Vec<&str> = self.requires.iter().map(String::as_str).collect();
        let mut missing_build: Vec<&str> = self.build_requires.iter().map(String::as_str).collect();
        let mut last_requires = None;
        let mut last_build = None;
        let mut last_kept = None;
        let mut edits = Vec::new();

        for &line in &block {
            let Some((tag, value)) = line.directive.requirement() else {
                continue;
            };
            let (missing, last) = if tag == "Requires" {
                (&mut missing_requires, &mut last_requires)
            } else {
                (&mut missing_build, &mut last_build)
            };
            match missing.iter().position(|v| *v == value) {
                Some(i) => {
                    missing.remove(i);
                    *last = Some(line);
                    last_kept = Some(line);
                }
                None => edits.push(Edit {
                    range: line.start..line.next,
                    replacement: String::new(),
                }),
            }
        }
        let dropped = edits.len();

        let insertions = [
            ("Requires", missing_requires, last_requires),
            ("BuildRequires", missing_build, last_build.or(last_kept)),
        ];
        for (tag, missing, anchor) in insertions {
            if missing.is_empty() {
                continue;
            }
            let prefix = tag_prefix(&block, tag);
            let (at, mut text) = match anchor {
                Some(line) if line.next == line.end => (line.next, eol.to_string()),
                Some(line) => (line.next, String::new()),
                None => (first.start, String::new()),
            };
            for value in missing {
                text.push_str(&prefix);
                text.push_str(value);
                text.push_str(eol);
            }
            edits.push(Edit::insert(at, text));
        }

        debug!(dropped, inserted = edits.len() - dropped, "requirement edits");
        Ok(edits)
    }

    /// Insert new files after the last non-blank line of the main `%files`
    /// section.
    fn new_files_edit(
        &self,
        lines: &[Line<'_>],
        main_files: usize,
        text: &str,
        eol: &str,
    ) -> Option<Edit> {
        if self.new_files.is_empty() {
            return None;
        }

        let section_end = lines[main_files + 1..]
            .iter()
            .position(|l| l.directive.is_subpackage_files() || l.directive == Directive::Changelog)
            .map_or(lines.len(), |i| main_files + 1 + i);
        let mut insert_at = section_end;
        while insert_at > main_files + 1 && lines[insert_at - 1].is_blank() {
            insert_at -= 1;
        }

        let mut block = String::new();
        let at = match lines.get(insert_at) {
            Some(line) => line.start,
            None => {
                if !text.is_empty() && !text.ends_with('\n') {
                    block.push_str(eol);
                }
                text.len()
            }
        };
        for file in &self.new_files {
            block.push_str(file);
            block.push_str(eol);
        }
        Some(Edit::insert(at, block))
    }

    /// Insert the entries added since parsing right after `%changelog`.
    fn changelog_edit(&self, changelog: &Line<'_>, text: &str, eol: &str) -> Option<Edit> {
        let added = self.changelog.added();
        if added.is_empty() {
            return None;
        }

        let following = &text[changelog.next..];
        let next_is_blank = following
            .lines()
            .next()
            .is_some_and(|l| l.trim().is_empty());

        let mut block = String::new();
        if changelog.next == changelog.end {
            block.push_str(eol);
        }
        block.push_str(&added.join("\n\n").replace('\n', eol));
        block.push_str(eol);
        if !following.trim().is_empty() && !next_is_blank {
            block.push_str(eol);
        }
        Some(Edit::insert(changelog.next, block))
    }
}

/// Replace the value of the first `tag:` line.
fn field_edit(lines: &[Line<'_>], tag: &str, value: Option<&str>) -> Option<Edit> {
    let value = value?;
    let line = lines.iter().find(|l| match l.directive {
        Directive::Version(_) => tag == "Version",
        Directive::Release(_) => tag == "Release",
        _ => false,
    })?;
    let range = field_value_range(line.content, tag);
    Some(Edit {
        range: line.start + range.start..line.start + range.end,
        replacement: value.to_string(),
    })
}

/// Text in front of the value of a new `tag:` line.
///
/// Copies an existing `tag:` line of the block, else pads to the value
/// column of the other requirement tag, else uses a single space.
fn tag_prefix(block: &[&Line<'_>], tag: &str) -> String {
    let same = block.iter().find(|l| {
        l.directive
            .requirement()
            .is_some_and(|(t, value)| t == tag && !value.is_empty())
    });
    if let Some(line) = same {
        let start = field_value_range(line.content, tag).start;
        return line.content[..start].to_string();
    }

    let column = block.iter().find_map(|l| {
        let (other, value) = l.directive.requirement()?;
        if value.is_empty() {
            return None;
        }
        let start = field_value_range(l.content, other).start;
        let gap = &l.content[other.len() + 1..start];
        (!gap.contains('\t')).then_some(start)
    });
    let head = format!("{tag}:");
    let width = column.unwrap_or(0).max(head.len() + 1);
    format!("{head:<width$}")
}

/// Splice `edits` into `text`. Edits may touch but not overlap.
fn apply_edits(text: &str, mut edits: Vec<Edit>) -> Result<String> {
    edits.sort_by_key(|e| (e.range.start, e.range.end));
    for pair in edits.windows(2) {
        if pair[1].range.start < pair[0].range.end {
            return Err(Error::MalformedDocument(format!(
                "overlapping edits at bytes {:?} and {:?}",
                pair[0].range, pair[1].range
            )));
        }
    }

    let extra: usize = edits.iter().map(|e| e.replacement.len()).sum();
    let mut output = String::with_capacity(text.len() + extra);
    let mut cursor = 0;
    for edit in &edits {
        output.push_str(&text[cursor..edit.range.start]);
        output.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    output.push_str(&text[cursor..]);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::UpdateOptions;
    use crate::source::NewSource;
    use chrono::NaiveDate;

    const SINATRA_SPEC: &str = "\
# Generated by gem2rpm
%global gem_name sinatra

Name: rubygem-%{gem_name}
Version: 1.3.2
Release: 3%{?dist}
Summary: Ruby-based web application framework
License: MIT
Requires: ruby(release)
Requires: rubygem(rack)
Requires: rubygem(tilt)
BuildRequires: rubygems-devel
BuildRequires: rubygem(rack-test)
BuildArch: noarch

%description
Sinatra is a DSL for quickly creating web applications in Ruby.

%package doc
Summary: Documentation for %{name}
Requires: %{name} = %{version}-%{release}

%files
%dir %{gem_instdir}
%{gem_libdir}
%doc %{gem_instdir}/LICENSE

%files doc
%doc %{gem_instdir}/README.md

%changelog
* Mon Jan 07 2013 Jane Doe <jane@example.com> - 1.3.2-3
- Rebuilt
";

    fn options() -> UpdateOptions {
        UpdateOptions::new("Jane Doe <jane@example.com>")
            .with_date(NaiveDate::from_ymd_opt(2013, 10, 29).unwrap())
    }

    #[test]
    fn render_unchanged_is_identity() {
        let spec = SpecMetadata::parse(SINATRA_SPEC);
        assert_eq!(spec.render().unwrap(), SINATRA_SPEC);
    }

    #[test]
    fn render_full_update() {
        let mut spec = SpecMetadata::parse(SINATRA_SPEC);
        let source = NewSource::new("1.4.0")
            .with_deps(["rack", "rack-protection", "tilt"])
            .with_dev_deps(["rack-test"])
            .with_files(["/lib/sinatra.rb", "/LICENSE", "/AUTHORS.md", "/README.md"]);
        spec.update_to(&source, &options());

        let expected = "\
# Generated by gem2rpm
%global gem_name sinatra

Name: rubygem-%{gem_name}
Version: 1.4.0
Release: 1%{?dist}
Summary: Ruby-based web application framework
License: MIT
Requires: ruby(release)
Requires: rubygem(rack)
Requires: rubygem(tilt)
Requires: rubygem(rack-protection)
BuildRequires: rubygems-devel
BuildRequires: rubygem(rack-test)
BuildArch: noarch

%description
Sinatra is a DSL for quickly creating web applications in Ruby.

%package doc
Summary: Documentation for %{name}
Requires: %{name} = %{version}-%{release}

%files
%dir %{gem_instdir}
%{gem_libdir}
%doc %{gem_instdir}/LICENSE
%{gem_instdir}/AUTHORS.md

%files doc
%doc %{gem_instdir}/README.md

%changelog
* Tue Oct 29 2013 Jane Doe <jane@example.com> - 1.4.0-1%{?dist}
- Update to version 1.4.0

* Mon Jan 07 2013 Jane Doe <jane@example.com> - 1.3.2-3
- Rebuilt
";
        assert_eq!(spec.render().unwrap(), expected);
    }

    #[test]
    fn render_keeps_field_spacing() {
        let input = "Version:    1.0\nRelease:\t2\nRequires: a\n%files\n%changelog\n";
        let mut spec = SpecMetadata::parse(input);
        spec.version = Some("1.1".to_string());
        spec.release = Some("1".to_string());
        assert_eq!(
            spec.render().unwrap(),
            "Version:    1.1\nRelease:\t1\nRequires: a\n%files\n%changelog\n"
        );
    }

    #[test]
    fn requirement_edits_keep_interleaved_lines() {
        let input = "\
Requires: a
# note
BuildRequires: b
Requires: x
Requires: c
%files
%changelog
";
        let mut spec = SpecMetadata::parse(input);
        spec.requires = vec!["a".to_string(), "c".to_string(), "d".to_string()];
        assert_eq!(
            spec.render().unwrap(),
            "Requires: a\n# note\nBuildRequires: b\nRequires: c\nRequires: d\n%files\n%changelog\n"
        );
    }

    #[test]
    fn aligned_requirements_untouched_without_changes() {
        let input = "\
Version:        1.0.0
Requires:       ruby(release)
Requires:       rubygem(json)
BuildRequires:  rubygems-devel
%files
%changelog
";
        let mut spec = SpecMetadata::parse(input);
        assert_eq!(spec.render().unwrap(), input);

        spec.reconcile_deps(&NewSource::new("1.0.0").with_deps(["json"]));
        assert_eq!(spec.render().unwrap(), input);
    }

    #[test]
    fn conditional_requirements_survive() {
        let input = "\
Requires: ruby(release)
%if 0%{?fedora}
Requires: rubygem(json)
%endif
%files
%changelog
";
        let mut spec = SpecMetadata::parse(input);
        assert_eq!(spec.render().unwrap(), input);

        spec.reconcile_deps(&NewSource::new("2").with_deps(["json", "rack"]));
        assert_eq!(
            spec.render().unwrap(),
            "Requires: ruby(release)\n%if 0%{?fedora}\nRequires: rubygem(json)\nRequires: rubygem(rack)\n%endif\n%files\n%changelog\n"
        );
    }

    #[test]
    fn new_lines_follow_block_alignment() {
        let input = "\
Requires:       ruby(release)
Requires:       rubygem(old)
%files
%changelog
";
        let mut spec = SpecMetadata::parse(input);
        spec.requires = vec!["ruby(release)".to_string(), "rubygem(new)".to_string()];
        spec.build_requires = vec!["rubygems-devel".to_string()];
        assert_eq!(
            spec.render().unwrap(),
            "Requires:       ruby(release)\nRequires:       rubygem(new)\nBuildRequires:  rubygems-devel\n%files\n%changelog\n"
        );
    }

    #[test]
    fn empty_requirement_line_untouched() {
        let input = "Requires:\nRequires: a\n%files\n%changelog\n";
        let spec = SpecMetadata::parse(input);
        assert_eq!(spec.requires, vec!["", "a"]);
        assert_eq!(spec.render().unwrap(), input);
    }

    #[test]
    fn subpackage_requires_untouched() {
        let input = "\
Requires: a
%package doc
Requires: %{name}
%files
%changelog
";
        let mut spec = SpecMetadata::parse(input);
        spec.requires.push("b".to_string());
        assert_eq!(
            spec.render().unwrap(),
            "Requires: a\nRequires: b\n%package doc\nRequires: %{name}\n%files\n%changelog\n"
        );
    }

    #[test]
    fn new_files_without_subpackage_go_before_changelog() {
        let input = "Requires: a\n%files\n/lib\n\n\n%changelog\n* A\n- b\n";
        let mut spec = SpecMetadata::parse(input);
        spec.new_files = vec!["/x".to_string(), "/y".to_string()];
        assert_eq!(
            spec.render().unwrap(),
            "Requires: a\n%files\n/lib\n/x\n/y\n\n\n%changelog\n* A\n- b\n"
        );
    }

    #[test]
    fn new_files_at_end_of_document() {
        let input = "%changelog\n* A\n- b\n\nRequires: a\n%files\n/lib";
        let mut spec = SpecMetadata::parse(input);
        spec.new_files = vec!["/x".to_string()];
        assert_eq!(
            spec.render().unwrap(),
            "%changelog\n* A\n- b\n\nRequires: a\n%files\n/lib\n/x\n"
        );
    }

    #[test]
    fn changelog_marker_at_end_of_document() {
        let mut spec = SpecMetadata::parse("Requires: a\n%files\n%changelog");
        spec.changelog.prepend("* New\n- entry");
        assert_eq!(
            spec.render().unwrap(),
            "Requires: a\n%files\n%changelog\n* New\n- entry\n"
        );
    }

    #[test]
    fn multiple_added_entries() {
        let mut spec = SpecMetadata::parse("Requires: a\n%files\n%changelog\n* Old\n- x\n");
        spec.changelog.prepend("* First\n- 1");
        spec.changelog.prepend("* Second\n- 2");
        assert_eq!(
            spec.render().unwrap(),
            "Requires: a\n%files\n%changelog\n* Second\n- 2\n\n* First\n- 1\n\n* Old\n- x\n"
        );
    }

    #[test]
    fn crlf_line_endings_preserved() {
        let input = "Version: 1\r\nRequires: a\r\n%files\r\n/lib\r\n\r\n%changelog\r\n* Old\r\n- x\r\n";
        let mut spec = SpecMetadata::parse(input);
        spec.update_to(
            &NewSource::new("2").with_deps(["b"]).with_files(["/README"]),
            &options(),
        );
        let expected = concat!(
            "Version: 2\r\n",
            "Requires: a\r\n",
            "Requires: rubygem(b)\r\n",
            "%files\r\n",
            "/lib\r\n",
            "%{gem_instdir}/README\r\n",
            "\r\n",
            "%changelog\r\n",
            "* Tue Oct 29 2013 Jane Doe <jane@example.com> - 2-1%{?dist}\r\n",
            "- Update to version 2\r\n",
            "\r\n",
            "* Old\r\n",
            "- x\r\n",
        );
        assert_eq!(spec.render().unwrap(), expected);
    }

    #[test]
    fn missing_changelog_is_malformed() {
        let spec = SpecMetadata::parse("Requires: a\n%files\n");
        assert!(matches!(spec.render(), Err(Error::MalformedDocument(_))));
    }

    #[test]
    fn missing_files_is_malformed() {
        let spec = SpecMetadata::parse("Requires: a\n%files doc\n%changelog\n");
        assert!(matches!(spec.render(), Err(Error::MalformedDocument(_))));
    }

    #[test]
    fn missing_requirements_is_malformed() {
        let spec = SpecMetadata::parse("%package doc\nRequires: a\n%files\n%changelog\n");
        let err = spec.render().unwrap_err();
        assert_eq!(
            err,
            Error::MalformedDocument("no Requires or BuildRequires in main package".to_string())
        );
    }

    #[test]
    fn changelog_blank_line_not_doubled() {
        let mut spec = SpecMetadata::parse("Requires: a\n%files\n%changelog\n\n* Old\n- x\n");
        spec.changelog.prepend("* New\n- y");
        assert_eq!(
            spec.render().unwrap(),
            "Requires: a\n%files\n%changelog\n* New\n- y\n\n* Old\n- x\n"
        );
    }

    #[test]
    fn overlapping_edits_rejected() {
        let edits = vec![
            Edit {
                range: 2..6,
                replacement: "x".to_string(),
            },
            Edit {
                range: 4..8,
                replacement: "y".to_string(),
            },
        ];
        assert!(matches!(
            apply_edits("0123456789", edits),
            Err(Error::MalformedDocument(_))
        ));
    }

    #[test]
    fn touching_edits_applied_in_order() {
        let edits = vec![
            Edit {
                range: 2..5,
                replacement: String::new(),
            },
            Edit::insert(2, "ab".to_string()),
            Edit::insert(2, "cd".to_string()),
        ];
        assert_eq!(apply_edits("0123456789", edits).unwrap(), "01abcd56789");
    }
}
