use super::easyrsa::{easyrsa_installations, resolve_easyrsa, Version};
use crate::error_handling::types::ProvisionError;
use flate2::read::GzDecoder;
use log::{debug, info, warn};
use serde::Deserialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const GITHUB_RELEASE_API: &str = "https://api.github.com/repos/OpenVPN/easy-rsa/releases";
const USER_AGENT: &str = concat!("naumachia/", env!("CARGO_PKG_VERSION"));
const API_TIMEOUT: Duration = Duration::from_secs(5);

/// Subset of a GitHub release object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

impl Release {
    pub fn version(&self) -> Option<Version> {
        Version::from_dir_name(&self.tag_name)
    }

    /// The gzipped tarball attached to the release, if any.
    pub fn tarball(&self) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|asset| asset.name.ends_with(".tgz"))
    }
}

/// Where EasyRSA releases come from.
pub trait ReleaseSource: Send + Sync {
    fn latest(&self) -> impl Future<Output = Result<Release, ProvisionError>> + Send;

    fn download(
        &self,
        asset: &ReleaseAsset,
    ) -> impl Future<Output = Result<Vec<u8>, ProvisionError>> + Send;
}

/// Releases published on GitHub.
#[derive(Debug, Clone)]
pub struct GithubReleases {
    client: reqwest::Client,
    api: String,
}

impl GithubReleases {
    pub fn new() -> Self {
        Self::with_api(GITHUB_RELEASE_API)
    }

    pub fn with_api<S: Into<String>>(api: S) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api: api.into(),
        }
    }
}

impl Default for GithubReleases {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseSource for GithubReleases {
    async fn latest(&self) -> Result<Release, ProvisionError> {
        let url = format!("{}/latest", self.api.trim_end_matches('/'));
        debug!("Fetching {}", url);
        let release = self
            .client
            .get(&url)
            .timeout(API_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json::<Release>()
            .await?;
        Ok(release)
    }

    async fn download(&self, asset: &ReleaseAsset) -> Result<Vec<u8>, ProvisionError> {
        info!("Downloading {}", asset.browser_download_url);
        let bytes = self
            .client
            .get(&asset.browser_download_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

/// Whether `release` is worth installing next to `installed`.
pub fn is_newer(release: &Version, installed: Option<&Version>) -> bool {
    match installed {
        Some(installed) => release > installed,
        None => true,
    }
}

/// Unpacks a `.tgz` release archive into `dest`.
pub fn extract_release(archive: &[u8], dest: &Path) -> Result<(), ProvisionError> {
    std::fs::create_dir_all(dest)?;
    let mut tarball = tar::Archive::new(GzDecoder::new(archive));
    tarball
        .unpack(dest)
        .map_err(|e| ProvisionError::ReleaseFailed(format!("unable to extract release: {}", e)))
}

/// Installs the latest release under `tools_dir` when it is newer than every
/// installation already there. Returns the version installed, if any.
pub async fn update_easyrsa<S: ReleaseSource>(
    source: &S,
    tools_dir: &Path,
) -> Result<Option<Version>, ProvisionError> {
    let installed = easyrsa_installations(tools_dir)?.pop().map(|(v, _)| v);

    let release = source.latest().await?;
    let version = release.version().ok_or_else(|| {
        ProvisionError::ReleaseFailed(format!("unrecognised release tag '{}'", release.tag_name))
    })?;

    if !is_newer(&version, installed.as_ref()) {
        debug!("EasyRSA {} is up to date", version);
        return Ok(None);
    }

    let asset = release
        .tarball()
        .ok_or_else(|| ProvisionError::ReleaseFailed("no .tgz asset in release".to_string()))?;
    let archive = source.download(asset).await?;

    let dest = tools_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_release(&archive, &dest))
        .await
        .map_err(|e| ProvisionError::ReleaseFailed(e.to_string()))??;

    info!("Updated EasyRSA to {}", version);
    Ok(Some(version))
}

/// Picks the easyrsa executable, first checking for a newer release when
/// `update` is set and no explicit path was given.
///
/// A failed update is logged and the installed version is used instead.
pub async fn obtain_easyrsa<S: ReleaseSource>(
    source: &S,
    explicit: Option<&Path>,
    tools_dir: &Path,
    update: bool,
) -> Result<PathBuf, ProvisionError> {
    if update && explicit.is_none() {
        if let Err(e) = update_easyrsa(source, tools_dir).await {
            warn!("Failed to update EasyRSA: {}", e);
        }
    }
    resolve_easyrsa(explicit, tools_dir)
}

#[cfg(test)]
pub mod stub {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::sync::Mutex;

    /// Serves one release from memory and counts downloads.
    pub struct StubReleases {
        pub release: Option<Release>,
        pub archive: Vec<u8>,
        pub downloads: Mutex<usize>,
    }

    impl StubReleases {
        pub fn new(tag: &str) -> Self {
            Self {
                release: Some(Release {
                    tag_name: tag.to_string(),
                    assets: vec![ReleaseAsset {
                        name: format!("EasyRSA-{}.tgz", tag.trim_start_matches('v')),
                        browser_download_url: "https://example.invalid/easyrsa.tgz".to_string(),
                    }],
                }),
                archive: tarball(&format!("EasyRSA-{}", tag.trim_start_matches('v'))),
                downloads: Mutex::new(0),
            }
        }

        /// A source whose API is unreachable.
        pub fn offline() -> Self {
            Self {
                release: None,
                archive: Vec::new(),
                downloads: Mutex::new(0),
            }
        }

        pub fn downloads(&self) -> usize {
            *self.downloads.lock().unwrap()
        }
    }

    impl ReleaseSource for StubReleases {
        async fn latest(&self) -> Result<Release, ProvisionError> {
            self.release
                .clone()
                .ok_or_else(|| ProvisionError::ReleaseFailed("network unreachable".to_string()))
        }

        async fn download(&self, _asset: &ReleaseAsset) -> Result<Vec<u8>, ProvisionError> {
            *self.downloads.lock().unwrap() += 1;
            Ok(self.archive.clone())
        }
    }

    /// A `.tgz` holding `<top>/easyrsa`, laid out like a real release.
    pub fn tarball(top: &str) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let script = b"#!/bin/sh\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(script.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{}/easyrsa", top), &script[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }
}
