use crate::error_handling::types::ProvisionError;
use log::{debug, info};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn installation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:(?:EasyRSA-)?v?)((?:\d+\.)*\d+)$")
            .expect("installation pattern is valid")
    })
}

/// Dotted numeric release version, ordered component by component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(Vec<u64>);

impl Version {
    pub fn parse(text: &str) -> Option<Self> {
        text.split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()
            .map(Version)
    }

    /// Version encoded in an installation directory name such as
    /// `EasyRSA-3.1.7`, `v3.0.8` or `3.2`.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        installation_pattern()
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| Self::parse(m.as_str()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Lists the EasyRSA installations unpacked under `tools_dir`, oldest first.
///
/// A missing `tools_dir` simply has no installations.
pub fn easyrsa_installations(tools_dir: &Path) -> Result<Vec<(Version, PathBuf)>, ProvisionError> {
    if !tools_dir.is_dir() {
        debug!("Tools directory {} does not exist", tools_dir.display());
        return Ok(Vec::new());
    }

    let mut installations = Vec::new();
    for entry in std::fs::read_dir(tools_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let version = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(Version::from_dir_name);
        if let Some(version) = version {
            debug!("Found EasyRSA {} at {}", version, path.display());
            installations.push((version, path));
        }
    }

    installations.sort();
    Ok(installations)
}

/// Path of the `easyrsa` script in the newest installation under `tools_dir`.
pub fn latest_easyrsa(tools_dir: &Path) -> Result<Option<PathBuf>, ProvisionError> {
    Ok(easyrsa_installations(tools_dir)?
        .pop()
        .map(|(_, dir)| dir.join("easyrsa")))
}

/// Picks the easyrsa executable: `explicit` when given, otherwise the newest
/// installation under `tools_dir`.
pub fn resolve_easyrsa(explicit: Option<&Path>, tools_dir: &Path) -> Result<PathBuf, ProvisionError> {
    let easyrsa = match explicit {
        Some(path) if path.exists() => path.to_path_buf(),
        Some(path) => return Err(ProvisionError::EasyRsaNotFound(path.to_path_buf())),
        None => latest_easyrsa(tools_dir)?
            .ok_or_else(|| ProvisionError::EasyRsaNotFound(tools_dir.to_path_buf()))?,
    };

    info!("Using easyrsa installation at {}", easyrsa.display());
    Ok(easyrsa)
}
