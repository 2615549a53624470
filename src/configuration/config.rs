use super::types::*;
use crate::error_handling::types::ConfigError;
use log::{debug, error, info};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Longest interface name the kernel accepts (IFNAMSIZ minus the NUL byte).
pub const MAX_IFNAME_LEN: usize = 15;

fn challenge_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("challenge name pattern is valid")
    })
}

fn hostname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9.-]*[A-Za-z0-9])?$")
            .expect("hostname pattern is valid")
    })
}

/// Joins `name` and `domain` with a dot, or returns `name` alone when there is
/// no domain (or it is empty).
pub fn append_domain(name: &str, domain: Option<&str>) -> String {
    match domain {
        Some(domain) if !domain.is_empty() => format!("{}.{}", name, domain),
        _ => name.to_string(),
    }
}

/// Host side name of the veth pair a challenge's VPN container plugs into the
/// host namespace.
pub fn veth_name(challenge: &str) -> String {
    format!("vh-{}", challenge)
        .chars()
        .take(MAX_IFNAME_LEN)
        .collect()
}

impl ConfigFormat {
    /// Picks the syntax from the file extension. Anything that is not YAML is
    /// read as TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        }
    }
}

impl RegistryConfig {
    /// Loads, completes and validates a registry file.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the file cannot be read, does not parse in
    /// the format implied by its extension, or fails [`RegistryConfig::validate`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Using config from {}", path.display());

        let text = std::fs::read_to_string(path).map_err(|e| {
            error!("Unable to read config file {}: {}", path.display(), e);
            ConfigError::IoError(e)
        })?;

        Self::parse(&text, ConfigFormat::from_path(path))
    }

    /// Same as [`RegistryConfig::from_file`] for an in-memory document.
    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let mut config: RegistryConfig = match format {
            ConfigFormat::Toml => {
                toml::from_str(text).map_err(|e| ConfigError::TomlError(e.to_string()))?
            }
            ConfigFormat::Yaml => {
                serde_yaml::from_str(text).map_err(|e| ConfigError::YamlError(e.to_string()))?
            }
        };
        debug!("Read from file: {:?}", config);

        config.resolve_commonnames();
        debug!("Modified: {:?}", config);

        config.validate()?;
        Ok(config)
    }

    /// Fills in every challenge common name that was left empty.
    pub fn resolve_commonnames(&mut self) {
        let domain = self.domain.clone();
        for (name, challenge) in self.challenges.iter_mut() {
            if challenge.commonname.is_empty() {
                challenge.commonname = append_domain(name, domain.as_deref());
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.challenges.is_empty() {
            return Err(ConfigError::ChallengesEmpty(
                "the registry does not declare any challenge".to_string(),
            ));
        }

        let mut ports: HashMap<u16, &str> = HashMap::new();
        let mut interfaces: HashMap<String, &str> = HashMap::new();

        for (name, challenge) in &self.challenges {
            if !challenge_name_pattern().is_match(name) {
                return Err(ConfigError::BadChallengeName(format!(
                    "'{}' may only contain letters, digits, '_', '.' and '-'",
                    name
                )));
            }

            if challenge.port == 0 {
                return Err(ConfigError::BadPort(format!(
                    "challenge '{}' has port 0",
                    name
                )));
            }
            if challenge.openvpn_management_port == Some(0) {
                return Err(ConfigError::BadPort(format!(
                    "challenge '{}' has management port 0",
                    name
                )));
            }

            if let Some(other) = ports.insert(challenge.port, name) {
                return Err(ConfigError::DuplicatePort(format!(
                    "challenges '{}' and '{}' both use UDP port {}",
                    other, name, challenge.port
                )));
            }

            let ifname = veth_name(name);
            if let Some(other) = interfaces.insert(ifname.clone(), name) {
                return Err(ConfigError::DuplicateInterface(format!(
                    "challenges '{}' and '{}' both map to interface {}",
                    other, name, ifname
                )));
            }
        }

        if self.registrar.port == 0 {
            return Err(ConfigError::BadPort("registrar has port 0".to_string()));
        }

        for client in &self.registrar.tls_clients {
            if !hostname_pattern().is_match(client) {
                return Err(ConfigError::BadClientName(format!(
                    "'{}' is not a valid host name",
                    client
                )));
            }
        }

        Ok(())
    }
}
