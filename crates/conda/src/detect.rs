//! Conda executable discovery
//!
//! Checks the conventional install locations before falling back to PATH,
//! so the tool works from shells where conda was never `init`-ed.

use crate::error::{CondaError, Result};
use std::path::PathBuf;

/// Candidate directories that may contain the conda executable
fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(exe) = std::env::var("CONDA_EXE") {
        paths.push(PathBuf::from(exe));
    }
    if let Ok(home) = std::env::var("CONDA_HOME") {
        let home = PathBuf::from(home);
        paths.push(home.join("bin/conda"));
        paths.push(home.join("condabin/conda"));
    }
    if let Some(user_home) = dirs::home_dir() {
        for install in ["miniconda3", "miniconda2", "anaconda3", "miniforge3"] {
            paths.push(user_home.join(install).join("bin/conda"));
        }
    }

    paths
}

/// Locate the conda executable
pub fn find_conda() -> Result<PathBuf> {
    for candidate in search_paths() {
        if candidate.is_file() {
            tracing::debug!("found conda at {}", candidate.display());
            return Ok(candidate);
        }
    }

    which::which("conda").map_err(|_| CondaError::CondaNotFound)
}
