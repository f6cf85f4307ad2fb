use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown fill side: {0}")]
    UnknownFillSide(String),
}
