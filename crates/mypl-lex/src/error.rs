use mypl_util::Position;
use thiserror::Error;

/// A fatal lexer failure: unrecognized character, malformed literal, or
/// an unterminated string/char.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} at {pos}")]
pub struct LexError {
    pub message: String,
    pub pos: Position,
}

pub type LexResult<T> = Result<T, LexError>;
