use datalith_core::error::{CommitError, MatchError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SledStoreError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("malformed meta record for {0}")]
    MalformedMeta(&'static str),
}

impl From<SledStoreError> for CommitError {
    fn from(err: SledStoreError) -> Self { CommitError::Storage(Box::new(err)) }
}

impl From<SledStoreError> for MatchError {
    fn from(err: SledStoreError) -> Self { MatchError::Io(err.to_string()) }
}

pub(crate) fn io_err(err: sled::Error) -> MatchError { MatchError::Io(err.to_string()) }
