//! Utility library for the Swerve Drive Software
//!
//! Holds the infrastructure shared by the executables: finding the software
//! root, loading parameter files, sessions and their logs and archives, and
//! the small maths helpers used throughout.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod host;
pub mod logger;
pub mod maths;
pub mod module;
pub mod params;
pub mod session;
pub mod time;
