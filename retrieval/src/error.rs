/// Errors surfaced by the retrieval core.
///
/// An empty corpus or a query that matches nothing is not an error: those
/// produce empty result lists.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The caller passed an argument outside the accepted domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An injected capability (tokenizer, dictionary corrector, ...) failed.
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    /// The index and the norms disagree. Always a builder bug.
    #[error("index inconsistency: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
