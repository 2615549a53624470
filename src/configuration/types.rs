use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// On-disk syntax of a registry file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

/// The challenge registry: every challenge served by the deployment plus the
/// switches for the optional services.
///
/// Missing keys fall back to their defaults, so a registry naming only its
/// challenges is complete:
///
/// ```toml
/// domain = "naum.example.org"
///
/// [challenges.middle]
/// port = 1194
/// files = ["middle/docker-compose.yml"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Adds the `eve` test client to the rendered topology
    pub eve: bool,
    /// Suffix appended to challenge and certificate names
    pub domain: Option<String>,
    /// Directory holding the challenge compose files, mounted into the manager
    pub challenges_directory: PathBuf,
    pub challenges: BTreeMap<String, ChallengeConfig>,
    pub registrar: RegistrarConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            eve: false,
            domain: None,
            challenges_directory: PathBuf::from("./challenges"),
            challenges: BTreeMap::new(),
            registrar: RegistrarConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Host UDP port the challenge's VPN endpoint is published on
    pub port: u16,
    /// Compose files, relative to the challenges directory
    pub files: Vec<String>,
    pub openvpn_management_port: Option<u16>,
    /// Empty until resolved against the registry domain
    pub commonname: String,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            port: 1194,
            files: Vec::new(),
            openvpn_management_port: None,
            commonname: String::new(),
        }
    }
}

impl ChallengeConfig {
    pub fn commonname(&self) -> &str {
        &self.commonname
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrarConfig {
    pub enabled: bool,
    pub port: u16,
    /// Docker network the registrar joins; `default` keeps the project network
    pub network: String,
    pub tls_enabled: bool,
    pub tls_verify_client: bool,
    pub tls_clients: Vec<String>,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 3960,
            network: String::from("default"),
            tls_enabled: false,
            tls_verify_client: false,
            tls_clients: Vec::new(),
        }
    }
}
