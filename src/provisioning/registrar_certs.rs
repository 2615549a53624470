use super::run_checked;
use crate::configuration::{append_domain, RegistryConfig};
use crate::error_handling::types::ProvisionError;
use crate::process::{CommandRunner, Invocation};
use crate::rendering::render_openssl_conf;
use log::{debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

const KEY_SPEC: &str = "rsa:2048";
const CA_DAYS: &str = "3650";
const LEAF_DAYS: &str = "825";

/// Issues the registrar's TLS certificates into a single directory.
///
/// Files are named after the certificate common name (`<cn>.crt`,
/// `<cn>.key`). A certificate that already exists is never reissued.
pub struct RegistrarCerts<'a, R: CommandRunner> {
    runner: &'a R,
    directory: PathBuf,
    domain: Option<String>,
}

impl<'a, R: CommandRunner> RegistrarCerts<'a, R> {
    pub fn new<P: AsRef<Path>>(runner: &'a R, directory: P, domain: Option<&str>) -> Self {
        Self {
            runner,
            directory: directory.as_ref().to_path_buf(),
            domain: domain.map(str::to_string),
        }
    }

    pub fn commonname(&self, name: &str) -> String {
        append_domain(name, self.domain.as_deref())
    }

    pub fn cert_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.crt", self.commonname(name)))
    }

    pub fn key_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.key", self.commonname(name)))
    }

    /// Makes sure a certificate exists for `name`.
    ///
    /// Without `ca` the certificate is a self-signed authority; otherwise it is
    /// signed by the certificate issued for `ca`. Returns whether a new
    /// certificate was created.
    pub async fn ensure(&self, name: &str, ca: Option<&str>) -> Result<bool, ProvisionError> {
        let cn = self.commonname(name);

        if self.cert_path(name).is_file() {
            info!("Using existing certificate for {}", cn);
            return Ok(false);
        }

        std::fs::create_dir_all(&self.directory)?;

        // The request config only has to live until openssl has read it
        let mut config = tempfile::NamedTempFile::new()?;
        config.write_all(render_openssl_conf(&cn, ca.is_none()).as_bytes())?;
        config.flush()?;
        let config_path = config.path().display().to_string();
        debug!("Rendered openssl config for {} at {}", cn, config_path);

        let key = format!("{}.key", cn);
        let crt = format!("{}.crt", cn);

        match ca {
            None => {
                run_checked(
                    self.runner,
                    Invocation::new("openssl")
                        .args(["req", "-x509", "-new", "-nodes", "-newkey", KEY_SPEC])
                        .args(["-days", CA_DAYS, "-sha256"])
                        .args(["-config", config_path.as_str(), "-extensions", "v3_ca"])
                        .args(["-keyout", key.as_str(), "-out", crt.as_str()])
                        .current_dir(&self.directory),
                )
                .await?;
            }
            Some(ca) => {
                let ca_cn = self.commonname(ca);
                let csr = format!("{}.csr", cn);

                run_checked(
                    self.runner,
                    Invocation::new("openssl")
                        .args(["req", "-new", "-nodes", "-newkey", KEY_SPEC])
                        .args(["-config", config_path.as_str()])
                        .args(["-keyout", key.as_str(), "-out", csr.as_str()])
                        .current_dir(&self.directory),
                )
                .await?;

                run_checked(
                    self.runner,
                    Invocation::new("openssl")
                        .args(["x509", "-req", "-in", csr.as_str()])
                        .arg("-CA")
                        .arg(format!("{}.crt", ca_cn))
                        .arg("-CAkey")
                        .arg(format!("{}.key", ca_cn))
                        .args(["-CAcreateserial", "-days", LEAF_DAYS, "-sha256"])
                        .args(["-extfile", config_path.as_str(), "-extensions", "v3_req"])
                        .args(["-out", crt.as_str()])
                        .current_dir(&self.directory),
                )
                .await?;

                let csr_path = self.directory.join(&csr);
                if csr_path.exists() {
                    if let Err(e) = std::fs::remove_file(&csr_path) {
                        warn!("Failed to remove {}: {}", csr_path.display(), e);
                    }
                }
            }
        }

        info!("Created new certificate for {}", cn);
        Ok(true)
    }
}

/// Ensures the CA, the registrar certificate and one certificate per TLS
/// client. Returns the common names of the certificates that were created.
pub async fn ensure_registrar_certs<R: CommandRunner>(
    runner: &R,
    directory: &Path,
    config: &RegistryConfig,
) -> Result<Vec<String>, ProvisionError> {
    info!(
        "Setting up certificates for registrar in {}",
        directory.display()
    );
    let certs = RegistrarCerts::new(runner, directory, config.domain.as_deref());

    let mut requests: Vec<(&str, Option<&str>)> = vec![("ca", None), ("registrar", Some("ca"))];
    requests.extend(
        config
            .registrar
            .tls_clients
            .iter()
            .map(|client| (client.as_str(), Some("ca"))),
    );

    let mut created = Vec::new();
    for (name, ca) in requests {
        if certs.ensure(name, ca).await? {
            created.push(certs.commonname(name));
        }
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ConfigFormat;
    use crate::process::runner::RecordingRunner;
    use tempfile::TempDir;

    fn registry() -> RegistryConfig {
        RegistryConfig::parse(
            "domain = \"naum.org\"\n[challenges.middle]\n[registrar]\ntls_enabled = true\ntls_clients = [\"ctfd\"]\n",
            ConfigFormat::Toml,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_ca_is_self_signed() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::new();
        let certs = RegistrarCerts::new(&runner, dir.path(), Some("naum.org"));

        assert!(certs.ensure("ca", None).await.unwrap());

        let invocations = runner.invocations();
        assert_eq!(invocations.len(), 1);
        let args = &invocations[0].args;
        assert_eq!(&args[..2], &["req".to_string(), "-x509".to_string()]);
        assert!(args.contains(&"ca.naum.org.key".to_string()));
        assert!(args.contains(&"ca.naum.org.crt".to_string()));
        assert!(args.contains(&"v3_ca".to_string()));
        assert_eq!(invocations[0].cwd.as_deref(), Some(dir.path()));
    }

    #[tokio::test]
    async fn test_leaf_is_signed_by_ca() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::new();
        let certs = RegistrarCerts::new(&runner, dir.path(), Some("naum.org"));

        assert!(certs.ensure("registrar", Some("ca")).await.unwrap());

        let commands = runner.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].starts_with("openssl req -new"));
        assert!(commands[0].contains("-out registrar.naum.org.csr"));
        assert!(commands[1].starts_with("openssl x509 -req -in registrar.naum.org.csr"));
        assert!(commands[1].contains("-CA ca.naum.org.crt -CAkey ca.naum.org.key"));
        assert!(commands[1].ends_with("-out registrar.naum.org.crt"));
    }

    #[tokio::test]
    async fn test_existing_certificate_is_kept() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("registrar.crt"), "CERT").unwrap();
        let runner = RecordingRunner::new();
        let certs = RegistrarCerts::new(&runner, dir.path(), None);

        assert!(!certs.ensure("registrar", Some("ca")).await.unwrap());
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_registrar_certs_order() {
        let dir = TempDir::new().unwrap();
        let certs_dir = dir.path().join("certs");
        let runner = RecordingRunner::new();

        let created = ensure_registrar_certs(&runner, &certs_dir, &registry())
            .await
            .unwrap();

        assert_eq!(
            created,
            vec!["ca.naum.org", "registrar.naum.org", "ctfd.naum.org"]
        );
        assert!(certs_dir.is_dir());
        // one for the CA, two for each signed certificate
        assert_eq!(runner.commands().len(), 5);
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::new().fail_when("x509 -req", 1);

        let err = ensure_registrar_certs(&runner, dir.path(), &registry())
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::CommandFailed { .. }));
        assert_eq!(runner.commands().len(), 3);
    }
}
