//! Keep hand-maintained RPM spec files for Ruby gems in sync with upstream
//! releases.
//!
//! This crate parses the parts of an RPM spec document that track a gem's
//! upstream state (version, release, `Requires:`, `BuildRequires:`, `%files`
//! and `%changelog`), reconciles them with a new upstream release, and renders
//! the document back with only those regions changed.
//!
//! # Overview
//!
//! Spec files are shell-like templates with macros and conditionals that only
//! `rpmbuild` can fully evaluate. The fields a gem update touches are simple
//! line-oriented directives, so this crate scans for those and treats every
//! other line as opaque text that is preserved byte for byte.
//!
//! # Examples
//!
//! Update a spec to a new release:
//!
//! ```
//! use chrono::NaiveDate;
//! use rpmspec_sync::{NewSource, SpecMetadata, UpdateOptions};
//!
//! let input = "\
//! Version: 1.0.0
//! Release: 3%{?dist}
//! Requires: ruby(release)
//! Requires: rubygem(rack)
//!
//! %files
//! %{gem_libdir}
//!
//! %changelog
//! * Mon Jan 07 2013 Jane Doe <jane@example.com> - 1.0.0-3
//! - Rebuilt
//! ";
//! let mut spec = SpecMetadata::parse(input);
//! let source = NewSource::new("2.0.0")
//!     .with_deps(["rack", "tilt"])
//!     .with_files(["/lib/foo.rb", "/README.md"]);
//! let options = UpdateOptions::new("Jane Doe <jane@example.com>")
//!     .with_date(NaiveDate::from_ymd_opt(2013, 10, 29).unwrap());
//! spec.update_to(&source, &options);
//!
//! let output = spec.render().unwrap();
//! assert!(output.starts_with("Version: 2.0.0\nRelease: 1%{?dist}\n"));
//! assert!(output.contains("Requires: rubygem(tilt)\n"));
//! assert!(output.contains("%{gem_instdir}/README.md\n"));
//! assert!(output.contains("* Tue Oct 29 2013 Jane Doe <jane@example.com> - 2.0.0-1%{?dist}\n"));
//! ```

mod changelog;
mod directive;
mod error;
mod files;
mod gemfile;
mod metadata;
mod options;
mod parser;
mod reconcile;
mod render;
mod repo;
mod requirement;
mod source;

// Re-export public types
pub use changelog::{Changelog, ChangelogEntry};
pub use error::{Error, Result};
pub use files::{FileManifest, PathMacros, BINDIR_MACRO, INSTDIR_MACRO, LIBDIR_MACRO};
pub use gemfile::{evaluate, Declaration, DeclarationContext, Gemfile};
pub use metadata::SpecMetadata;
pub use options::{UpdateOptions, DEFAULT_RELEASE};
pub use reconcile::reconcile_requirements;
pub use repo::{parse_yum_info, VersionLookup, Yum};
pub use requirement::{DepSet, Requirement};
pub use source::NewSource;
