use thiserror::Error;

/// A single runtime-failure kind, annotated with the frame and
/// instruction offset that raised it.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message} (in '{function_name}' at instruction {pc})")]
pub struct VMError {
    pub message: String,
    pub function_name: String,
    pub pc: usize,
}

pub type VMResult<T> = Result<T, VMError>;
