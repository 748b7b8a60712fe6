use mypl_util::Position;
use thiserror::Error;

/// The checker's single failure kind: a violated rule annotated with the
/// offending token's position.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message} at {pos}")]
pub struct StaticError {
    pub message: String,
    pub pos: Position,
}

pub type StaticResult<T> = Result<T, StaticError>;
