pub mod config;
pub mod types;

pub use config::append_domain;
pub use types::{ChallengeConfig, ConfigFormat, RegistrarConfig, RegistryConfig};
