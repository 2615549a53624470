//! Error types shared by every subsystem of the tool.

pub mod types;
