use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Tree construction was attempted over zero leaves.
    EmptyInput,
    /// Proof extraction was requested for a digest absent from the leaf level.
    LeafNotFound(String),
    /// A worker thread died or reported an error before its terminal message.
    WorkerFailure(String),
    /// Two workers computed different roots from the same input. Internal
    /// bug in chunk partitioning or tree determinism, never user input.
    RootMismatch,
    Hex(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "cannot build a merkle tree from zero leaves"),
            Error::LeafNotFound(leaf) => write!(f, "leaf not found in tree: {leaf}"),
            Error::WorkerFailure(msg) => write!(f, "worker failure: {msg}"),
            Error::RootMismatch => write!(f, "workers computed divergent roots"),
            Error::Hex(msg) => write!(f, "hex error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Error::Hex(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
