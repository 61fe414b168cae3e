//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the environment variable pointing at the software root directory, i.e. the directory
/// containing `params/` and `sessions/`.
pub const SW_ROOT_ENV_VAR: &str = "MPPI_SW_ROOT";

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the software root directory from the environment.
pub fn get_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
