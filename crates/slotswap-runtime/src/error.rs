//! Runtime errors.

use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to execute '{binary}': {source}")]
    Spawn {
        binary: String,
        source: std::io::Error,
    },

    #[error("`{command}` exited with {code:?}: {stderr}")]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("unit {0} does not exist")]
    NoSuchUnit(String),
}
