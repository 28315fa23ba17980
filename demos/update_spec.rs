use rpmspec_sync::{Gemfile, NewSource, SpecMetadata, UpdateOptions};
use tracing_subscriber::EnvFilter;

const SPEC: &str = "\
%global gem_name sinatra

Name: rubygem-%{gem_name}
Version: 1.3.2
Release: 3%{?dist}
Summary: Ruby-based web application framework
License: MIT
Requires: ruby(release)
Requires: rubygem(rack)
Requires: rubygem(backports)
BuildRequires: rubygems-devel
BuildArch: noarch

%description
Sinatra is a DSL for quickly creating web applications in Ruby.

%files
%dir %{gem_instdir}
%{gem_libdir}
%doc %{gem_instdir}/LICENSE

%changelog
* Mon Jan 07 2013 Jane Doe <jane@example.com> - 1.3.2-3
- Rebuilt
";

const GEMFILE: &str = "\
source 'https://rubygems.org'

gem 'rack', '~> 1.5'
gem 'rack-protection', '~> 1.4'
gem 'tilt', '~> 1.3', '>= 1.3.4'

group :development, :test do
  gem 'rack-test'
  gem 'minitest', '~> 4.0'
end
";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let gemfile = Gemfile::parse(GEMFILE).expect("failed to evaluate gemfile");
    let source = NewSource::from_gemfile("1.4.0", &gemfile).with_files([
        "/lib/sinatra.rb",
        "/LICENSE",
        "/README.md",
        "/AUTHORS",
    ]);

    let mut spec = SpecMetadata::parse(SPEC);
    println!("=== Before ===");
    println!("Version:        {}", spec.get("version").unwrap_or("-"));
    println!("Requires:       {}", spec.requires.join(", "));
    println!("BuildRequires:  {}", spec.build_requires.join(", "));

    spec.update_to(&source, &UpdateOptions::new("Jane Doe <jane@example.com>"));
    println!("=== After ===");
    println!("Version:        {}", spec.get("version").unwrap_or("-"));
    println!("Requires:       {}", spec.requires.join(", "));
    println!("BuildRequires:  {}", spec.build_requires.join(", "));
    println!("New files:      {}", spec.new_files.join(" "));

    println!();
    println!("=== Rendered ===");
    print!("{}", spec.render().expect("failed to render spec"));
}
