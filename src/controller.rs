//! The `configure` pipeline: registry in, deployment directory out.

pub mod configurator;

pub use configurator::{ConfigureOptions, ConfigureReport, Configurator};
