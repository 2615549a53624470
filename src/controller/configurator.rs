use crate::configuration::RegistryConfig;
use crate::error_handling::types::{ControllerError, ProvisionError};
use crate::process::CommandRunner;
use crate::provisioning::{
    ensure_registrar_certs, init_pki, obtain_easyrsa, GithubReleases, ReleaseSource,
};
use crate::rendering::{
    render_compose, render_openvpn_conf, render_ovpn_env, write_compose, write_rendered,
    ComposeLayout,
};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Where the configure pipeline reads from and writes to.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigureOptions {
    /// Challenge registry (TOML or YAML)
    pub config: PathBuf,
    /// Rendered docker-compose output
    pub compose: PathBuf,
    /// OpenVPN config root and registrar certs directory
    pub layout: ComposeLayout,
    /// Explicit easyrsa executable; discovered under `tools_dir` when unset
    pub easyrsa: Option<PathBuf>,
    pub tools_dir: PathBuf,
    /// Install a newer EasyRSA release into `tools_dir` before using it
    pub update_easyrsa: bool,
    /// Shared Diffie-Hellman parameters, generated on first use
    pub dhparam: PathBuf,
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        let layout = ComposeLayout::default();
        Self {
            config: PathBuf::from("config.toml"),
            compose: PathBuf::from("docker-compose.yaml"),
            dhparam: layout.ovpn_configs.join("dh.pem"),
            layout,
            easyrsa: None,
            tools_dir: PathBuf::from("tools"),
            update_easyrsa: true,
        }
    }
}

/// What a configure run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigureReport {
    pub compose: PathBuf,
    /// Every challenge whose OpenVPN files were rendered, in name order
    pub configured: Vec<String>,
    /// Challenges that got a fresh config directory and PKI on this run
    pub initialized: Vec<String>,
    /// Registrar certificates issued on this run
    pub certificates: Vec<String>,
}

pub struct Configurator<R: CommandRunner, S: ReleaseSource = GithubReleases> {
    runner: R,
    releases: S,
    options: ConfigureOptions,
}

impl<R: CommandRunner> Configurator<R, GithubReleases> {
    pub fn new(runner: R, options: ConfigureOptions) -> Self {
        Self::with_releases(runner, GithubReleases::new(), options)
    }
}

impl<R: CommandRunner, S: ReleaseSource> Configurator<R, S> {
    pub fn with_releases(runner: R, releases: S, options: ConfigureOptions) -> Self {
        Self {
            runner,
            releases,
            options,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn options(&self) -> &ConfigureOptions {
        &self.options
    }

    pub fn releases(&self) -> &S {
        &self.releases
    }

    /// Loads the registry named in the options and applies it.
    pub async fn run(&self) -> Result<ConfigureReport, ControllerError> {
        let config = RegistryConfig::from_file(&self.options.config)?;
        info!("Configuration imported successfully");
        self.apply(&config).await
    }

    /// Renders and provisions everything `config` describes.
    ///
    /// Existing challenge directories and certificates are reused, so running
    /// this again after editing the registry only creates what is missing and
    /// refreshes the rendered files.
    pub async fn apply(&self, config: &RegistryConfig) -> Result<ConfigureReport, ControllerError> {
        let layout = &self.options.layout;

        // Resolve easyrsa before writing anything when a PKI has to be built
        let needs_pki = config
            .challenges
            .keys()
            .any(|name| !layout.ovpn_configs.join(name).is_dir());
        let easyrsa = if needs_pki {
            Some(
                obtain_easyrsa(
                    &self.releases,
                    self.options.easyrsa.as_deref(),
                    &self.options.tools_dir,
                    self.options.update_easyrsa,
                )
                .await?,
            )
        } else {
            debug!("Every challenge already has a config directory");
            None
        };

        let compose = render_compose(config, layout);
        write_compose(&self.options.compose, &compose)?;

        let mut report = ConfigureReport {
            compose: self.options.compose.clone(),
            ..Default::default()
        };

        for (name, challenge) in &config.challenges {
            let config_dir = layout.ovpn_configs.join(name);
            info!("Configuring '{}'", name);

            if !config_dir.is_dir() {
                std::fs::create_dir_all(&config_dir).map_err(ProvisionError::IoError)?;
                info!(
                    "Created new openvpn config directory {}",
                    config_dir.display()
                );

                let easyrsa = easyrsa.as_deref().ok_or_else(|| {
                    ProvisionError::EasyRsaNotFound(self.options.tools_dir.clone())
                })?;
                let initialized = init_pki(
                    &self.runner,
                    easyrsa,
                    &self.options.dhparam,
                    &config_dir,
                    challenge.commonname(),
                )
                .await;
                if let Err(e) = initialized {
                    discard_incomplete(&config_dir);
                    return Err(e.into());
                }
                report.initialized.push(name.clone());
            } else {
                info!(
                    "Using existing openvpn config directory {}",
                    config_dir.display()
                );
            }

            write_rendered(
                &config_dir.join("ovpn_env.sh"),
                &render_ovpn_env(name, challenge),
            )?;
            write_rendered(
                &config_dir.join("openvpn.conf"),
                &render_openvpn_conf(name, challenge),
            )?;
            report.configured.push(name.clone());
        }

        if config.registrar.enabled && config.registrar.tls_enabled {
            report.certificates =
                ensure_registrar_certs(&self.runner, &layout.registrar_certs, config).await?;
        }

        info!(
            "Configured {} challenges ({} new)",
            report.configured.len(),
            report.initialized.len()
        );
        Ok(report)
    }
}

/// Removes a config directory whose PKI setup failed, so the next run starts
/// over instead of treating it as initialised.
fn discard_incomplete(config_dir: &Path) {
    warn!(
        "Removing incomplete openvpn config directory {}",
        config_dir.display()
    );
    if let Err(e) = std::fs::remove_dir_all(config_dir) {
        warn!("Failed to remove {}: {}", config_dir.display(), e);
    }
}
