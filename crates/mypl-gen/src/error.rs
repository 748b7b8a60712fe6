use thiserror::Error;

/// Lowering only runs against an already-[`mypl_sem::Checker::check`]ed
/// program, so this should never surface in practice; it exists so an
/// internal-invariant violation fails loudly instead of panicking.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0}")]
pub struct GenError(pub String);

impl From<mypl_sem::StaticError> for GenError {
    fn from(e: mypl_sem::StaticError) -> Self {
        GenError(e.to_string())
    }
}

pub type GenResult<T> = Result<T, GenError>;
