//! Descriptor rendering.
//!
//! Everything the deployment reads at start-up is produced here from a
//! [`RegistryConfig`](crate::configuration::RegistryConfig):
//! - [`compose`]: the multi-service docker-compose topology.
//! - [`openvpn`]: `openvpn.conf` and `ovpn_env.sh` for each challenge endpoint.
//! - [`openssl`]: request configs used when issuing registrar certificates.
//!
//! Rendering itself is pure; only [`write_rendered`] touches the filesystem.

pub mod compose;
pub mod openssl;
pub mod openvpn;

pub use compose::{render_compose, write_compose, ComposeFile, ComposeLayout, Service};
pub use openssl::render_openssl_conf;
pub use openvpn::{render_openvpn_conf, render_ovpn_env};

use crate::error_handling::types::RenderError;
use log::{error, info};
use std::path::Path;

/// Writes rendered text to `path`, creating missing parent directories.
pub fn write_rendered(path: &Path, contents: &str) -> Result<(), RenderError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            error!("Failed to create directory {}: {}", parent.display(), e);
            RenderError::WriteFailed(parent.to_path_buf(), e)
        })?;
    }

    std::fs::write(path, contents).map_err(|e| {
        error!("Failed to write {}: {}", path.display(), e);
        RenderError::WriteFailed(path.to_path_buf(), e)
    })?;

    info!("Rendered {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_rendered_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/out.txt");
        write_rendered(&path, "hello\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_write_rendered_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        write_rendered(&path, "first").unwrap();
        write_rendered(&path, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }
}
