//! Error handling

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreesimError {
    /// Used when a model or a skyline rate is malformed.
    ///
    /// Raised at construction time: length mismatches between values and
    /// change times, non-increasing or non-positive change times, shape
    /// mismatches when broadcasting, unknown initial states, and the like.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Used when a simulation-state invariant is violated.
    ///
    /// Fixing a node twice, detaching a non-child, or drawing from an
    /// empty active set indicate a bug in event code rather than bad
    /// input; these are never caught internally.
    #[error("invalid simulation state: {0}")]
    State(String),
    /// The wall-clock budget of a simulation was exceeded.
    ///
    /// Unlike a rejected attempt this is surfaced to the caller, which may
    /// retry with different parameters.
    #[error("simulation timed out after {seconds:.3}s")]
    Timeout { seconds: f64 },
    /// A redirection of [``crate::newick::NewickError``]
    #[error("{value}")]
    Newick {
        /// The redirected error
        #[from]
        value: crate::newick::NewickError,
    },
}

impl TreesimError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        TreesimError::Config(msg.into())
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        TreesimError::State(msg.into())
    }
}
