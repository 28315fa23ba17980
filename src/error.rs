/// Error type for rpmspec-sync operations.
///
/// Parsing a spec document and reconciling it never fail; only rendering and
/// Gemfile evaluation produce errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The spec document lacks a section the renderer needs to patch.
    #[error("malformed spec document: {0}")]
    MalformedDocument(String),

    /// Gemfile path does not exist or cannot be read.
    #[error("gemfile not found: {0}")]
    GemfileNotFound(String),

    /// Gemfile at `path` could not be evaluated.
    #[error("invalid gemfile {path}: {reason}")]
    InvalidGemfile {
        /// Offending Gemfile path.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// Unsupported or unbalanced statement in Gemfile content.
    #[error("line {line}: {message}")]
    GemfileSyntax {
        /// 1-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },
}

/// Result type for rpmspec-sync operations.
pub type Result<T> = std::result::Result<T, Error>;
