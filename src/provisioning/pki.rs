use super::{absolute, run_checked};
use crate::error_handling::types::ProvisionError;
use crate::process::{CommandRunner, Invocation};
use log::{debug, error, info};
use std::path::Path;

const DH_BITS: &str = "2048";

/// Initialises the OpenVPN PKI of one challenge inside `directory`.
///
/// Generates the shared Diffie-Hellman parameters at `dhparam` first if they do
/// not exist yet, then drives `easyrsa` to build a CA named `ca.<commonname>`,
/// a server certificate for `commonname` and an initial CRL. Every step must
/// succeed; the first failing command aborts the initialisation.
pub async fn init_pki<R: CommandRunner>(
    runner: &R,
    easyrsa: &Path,
    dhparam: &Path,
    directory: &Path,
    commonname: &str,
) -> Result<(), ProvisionError> {
    // Commands run inside `directory`, so relative paths would resolve there
    let easyrsa = absolute(easyrsa)?;
    let dhparam = absolute(dhparam)?;
    let easyrsa_step = |args: &[&str]| {
        Invocation::new(&easyrsa)
            .args(args.iter().copied())
            .current_dir(directory)
    };

    if !dhparam.exists() {
        info!(
            "Generating Diffie-Hellman (DH) parameters at {}...",
            dhparam.display()
        );
        if let Some(parent) = dhparam.parent() {
            std::fs::create_dir_all(parent)?;
        }
        run_checked(
            runner,
            Invocation::new("openssl")
                .arg("dhparam")
                .arg("-out")
                .arg(dhparam.display().to_string())
                .arg(DH_BITS)
                .current_dir(directory),
        )
        .await?;
    }

    info!("Initializing public key infrastructure (PKI)");
    run_checked(runner, easyrsa_step(&["init-pki"])).await?;

    info!("Building certificate authority (CA)");
    run_checked(
        runner,
        easyrsa_step(&["build-ca", "nopass"]).stdin(format!("ca.{}\n", commonname)),
    )
    .await?;

    info!("Copying Diffie-Hellman (DH) parameters");
    let pki_dir = directory.join("pki");
    std::fs::create_dir_all(&pki_dir)?;
    std::fs::copy(&dhparam, pki_dir.join("dh.pem")).map_err(|e| {
        error!(
            "Failed to copy {} into {}: {}",
            dhparam.display(),
            pki_dir.display(),
            e
        );
        ProvisionError::IoError(e)
    })?;

    info!("Building server certificate");
    run_checked(
        runner,
        easyrsa_step(&["build-server-full", commonname, "nopass"]),
    )
    .await?;

    info!("Generating certificate revocation list (CRL)");
    run_checked(runner, easyrsa_step(&["gen-crl"])).await?;

    debug!("PKI ready in {}", pki_dir.display());
    Ok(())
}
