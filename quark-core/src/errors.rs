//! Crate-level error taxonomy (spec.md §7), following the same
//! central-`Error`-with-`From`-bridges shape as `dtu/src/errors.rs`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// `find_intersection` was called with an empty input set.
    #[error("find_intersection called with an empty method set")]
    EmptyInput,

    /// A rule document failed schema validation. The registry logs this
    /// and skips the rule rather than failing the whole load.
    #[error("malformed rule in {0}: {1}")]
    MalformedRule(String, String),

    /// A stage-5 success was recorded without a stage-4 ancestor having
    /// been found first. This can only happen if the matcher's own
    /// control flow is broken, so it is fatal rather than recoverable.
    #[error("internal invariant broken: {0}")]
    InternalInvariantBroken(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid regex keyword {0:?}: {1}")]
    InvalidKeywordRegex(String, regex::Error),
}
