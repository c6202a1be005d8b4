use thiserror::Error;

pub type Result<T> = std::result::Result<T, CondaError>;

#[derive(Error, Debug)]
pub enum CondaError {
    #[error(
        "conda could not be found. Install miniconda from \
         https://conda.io/miniconda.html or set CONDA_HOME to its install location"
    )]
    CondaNotFound,

    #[error("conda {command} exited with status {status}")]
    CommandFailed { command: String, status: i32 },

    #[error("Failed to parse conda info output: {0}")]
    InvalidInfo(String),

    #[error("Package not installed: {0}")]
    PackageNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] pynative_core::Error),
}
