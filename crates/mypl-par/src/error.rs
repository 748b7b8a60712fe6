use mypl_util::Position;
use thiserror::Error;

/// A parser failure: the message already encodes "expected" and "found"
/// form with the offending token's position baked in.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub pos: Position,
}

pub type ParseResult<T> = Result<T, ParseError>;
