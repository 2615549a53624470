//! Provisioning subsystem
//!
//! Creates the key material the rendered services expect to find on disk.
//!
//! Components:
//! - `easyrsa`: discovery of the EasyRSA installations available to the tool.
//! - `easyrsa_release`: installing newer EasyRSA releases from GitHub.
//! - `pki`: per-challenge OpenVPN PKI (CA, server certificate, DH, CRL).
//! - `registrar_certs`: CA-signed TLS certificates for the registrar and its clients.

pub mod easyrsa;
pub mod easyrsa_release;
pub mod pki;
pub mod registrar_certs;

pub use easyrsa::{easyrsa_installations, latest_easyrsa, resolve_easyrsa, Version};
pub use easyrsa_release::{obtain_easyrsa, update_easyrsa, GithubReleases, ReleaseSource};
pub use pki::init_pki;
pub use registrar_certs::{ensure_registrar_certs, RegistrarCerts};

use crate::error_handling::types::ProvisionError;
use crate::process::{CommandOutcome, CommandRunner, Invocation};
use log::error;
use std::path::{Path, PathBuf};

/// Runs `invocation` and turns a non-zero exit into [`ProvisionError::CommandFailed`].
pub(crate) async fn run_checked<R: CommandRunner>(
    runner: &R,
    invocation: Invocation,
) -> Result<CommandOutcome, ProvisionError> {
    let outcome = runner.run(&invocation).await?;
    if !outcome.is_success() {
        error!(
            "Command '{}' failed with exit code {:?}",
            invocation, outcome.code
        );
        if !outcome.stderr.is_empty() {
            error!("{}", outcome.stderr.trim_end());
        }
        return Err(ProvisionError::CommandFailed {
            command: invocation.to_string(),
            code: outcome.code,
        });
    }
    Ok(outcome)
}

/// Anchors a relative path at the current directory. Needed for paths handed to
/// commands that run with another working directory.
pub(crate) fn absolute(path: &Path) -> Result<PathBuf, ProvisionError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
