use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

/// Source of the version a distribution repository ships for a gem.
pub trait VersionLookup {
    /// Version of `rubygem-<name>` in the repository, if any.
    fn version_for(&self, name: &str) -> Option<String>;
}

/// [`VersionLookup`] backed by `yum info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Yum {
    /// Path of the yum executable.
    pub program: PathBuf,
    /// How long to wait for yum before giving up.
    pub timeout: Duration,
}

impl Default for Yum {
    fn default() -> Self {
        Yum {
            program: PathBuf::from("/usr/bin/yum"),
            timeout: Duration::from_secs(30),
        }
    }
}

impl Yum {
    fn query(&self, package: &str) -> Option<String> {
        let mut child = match Command::new(&self.program)
            .arg("info")
            .arg(package)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %self.program.display(), error = %e, "failed to run yum");
                return None;
            }
        };

        let mut stdout = child.stdout.take()?;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut output = String::new();
            let result = stdout.read_to_string(&mut output).map(|_| output);
            // The receiver is gone after a timeout.
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(output)) => {
                let _ = child.wait();
                Some(output)
            }
            Ok(Err(e)) => {
                warn!(package, error = %e, "failed to read yum output");
                let _ = child.wait();
                None
            }
            Err(_) => {
                warn!(package, timeout = ?self.timeout, "yum timed out");
                let _ = child.kill();
                let _ = child.wait();
                None
            }
        }
    }
}

impl VersionLookup for Yum {
    fn version_for(&self, name: &str) -> Option<String> {
        let package = format!("rubygem-{name}");
        let version = self.query(&package).and_then(|out| parse_yum_info(&out));
        debug!(package, version = version.as_deref().unwrap_or(""), "yum lookup");
        version
    }
}

/// Extract the version from `yum info` output.
///
/// Takes the first line starting with `Version` and returns the trimmed text
/// after its last `:`.
///
/// # Examples
///
/// ```
/// use rpmspec_sync::parse_yum_info;
///
/// let output = "\
/// Available Packages
/// Name        : rubygem-rack
/// Arch        : noarch
/// Version     : 1.5.2
/// Release     : 1.fc20
/// ";
/// assert_eq!(parse_yum_info(output).as_deref(), Some("1.5.2"));
/// assert_eq!(parse_yum_info("Error: No matching Packages to list\n"), None);
/// ```
pub fn parse_yum_info(output: &str) -> Option<String> {
    let line = output.lines().find(|line| line.starts_with("Version"))?;
    let version = line.rsplit(':').next()?.trim();
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}
