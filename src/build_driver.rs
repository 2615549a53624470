//! Image build driver.
//!
//! Finds every build descriptor below a root directory and hands each one to
//! the build tool, one after the other. The first failing build stops the run.
//!
//! Re-exports:
//! - [`discover_descriptors`]: the directory walk.
//! - [`BuildDriver`], [`BuildOptions`], [`BuildReport`]: the build loop.

pub mod discovery;
pub mod driver;

pub use discovery::{discover_descriptors, DEFAULT_DESCRIPTOR_NAMES};
pub use driver::{BuildDriver, BuildOptions, BuildReport};
