//! Matchable error variants for CLI-level branching.
//!
//! Most errors in this crate are plain `anyhow::Error` chains meant for a
//! human to read. A handful of outcomes the CLI needs to branch on - "no
//! object matches this prefix", "that branch name is invalid" - are instead
//! constructed as `FleaErrorKind` and recovered with `downcast_ref`.
//!
//! Grounded on `b2/Cargo.toml`'s `thiserror` dependency (the teacher's own
//! workspace member already reaches for it for exactly this purpose).

use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum FleaErrorKind {
    #[error("No object matches prefix {0}")]
    NoMatch(String),

    #[error("{0} objects match prefix {1}; provide more characters")]
    AmbiguousPrefix(usize, String),

    #[error("Branch names can't contain '/': {0}")]
    InvalidBranch(String),

    #[error("Not a flea repository (or any parent up to /)")]
    NoRepository,

    #[error("{0} is already a flea repository")]
    AlreadyInitialized(String),

    #[error("Root node is read-only")]
    ReadOnlyRoot,

    #[error("Nothing is staged; there's no tree to commit")]
    EmptyTree,
}
