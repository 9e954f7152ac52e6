//! Utility modules: developer log sink, logger setup, integer conversions.
pub mod devlog;
pub mod logger;
pub mod num;
