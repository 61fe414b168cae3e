//! Utility library for the MPPI controller workspace

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod host;
pub mod logger;
pub mod params;
pub mod session;
pub mod time;
