use crate::configuration::config::veth_name;
use crate::configuration::{append_domain, RegistryConfig};
use crate::error_handling::types::RenderError;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const COMPOSE_VERSION: &str = "2.4";
pub const MANAGER_SERVICE: &str = "manager";
pub const REGISTRAR_SERVICE: &str = "registrar";
pub const EVE_SERVICE: &str = "eve";
pub const VPN_SERVICE_PREFIX: &str = "openvpn_";
/// Network compose creates for the project when none is specified
pub const DEFAULT_NETWORK: &str = "default";

/// Port the OpenVPN daemon listens on inside every endpoint container.
pub const OPENVPN_CONTAINER_PORT: u16 = 1194;
pub const REGISTRAR_CONTAINER_PORT: u16 = 3960;

const MANAGER_CHALLENGES_MOUNT: &str = "/app/challenges";
const REGISTRAR_CERTS_MOUNT: &str = "/etc/registrar/certs";
const OPENVPN_CONFIG_MOUNT: &str = "/etc/openvpn";

/// Host directories referenced by volume mounts in the rendered file.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeLayout {
    pub ovpn_configs: PathBuf,
    pub registrar_certs: PathBuf,
}

impl Default for ComposeLayout {
    fn default() -> Self {
        Self {
            ovpn_configs: PathBuf::from("./openvpn/config"),
            registrar_certs: PathBuf::from("./registrar/certs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposeFile {
    pub version: String,
    pub services: BTreeMap<String, Service>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, Network>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Service {
    pub build: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cap_add: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expose: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Network {
    pub external: bool,
}

impl ComposeFile {
    pub fn to_yaml(&self) -> Result<String, RenderError> {
        serde_yaml::to_string(self).map_err(|e| RenderError::SerializeFailed(e.to_string()))
    }
}

/// Name of the compose service running the VPN endpoint of `challenge`.
pub fn vpn_service_name(challenge: &str) -> String {
    format!("{}{}", VPN_SERVICE_PREFIX, challenge)
}

/// Builds the service topology for `config`.
///
/// The result always holds the `manager` and one `openvpn_<name>` service per
/// challenge; `registrar` and `eve` follow their switches in the registry.
pub fn render_compose(config: &RegistryConfig, layout: &ComposeLayout) -> ComposeFile {
    let mut services = BTreeMap::new();
    let mut networks = BTreeMap::new();

    services.insert(MANAGER_SERVICE.to_string(), manager_service(config));

    if config.registrar.enabled {
        let registrar = registrar_service(config, layout);
        if config.registrar.network != DEFAULT_NETWORK {
            networks.insert(
                config.registrar.network.clone(),
                Network { external: true },
            );
        }
        services.insert(REGISTRAR_SERVICE.to_string(), registrar);
    }

    for (name, challenge) in &config.challenges {
        let mut environment = BTreeMap::new();
        environment.insert("NAUM_CHAL".to_string(), name.clone());
        environment.insert("NAUM_PORT".to_string(), challenge.port.to_string());
        environment.insert("NAUM_FILES".to_string(), challenge.files.join(","));
        environment.insert("NAUM_MGM_HOST".to_string(), MANAGER_SERVICE.to_string());
        environment.insert("NAUM_VETHHOST".to_string(), veth_name(name));

        let service = Service {
            build: "./openvpn".to_string(),
            image: "naumachia/openvpn".to_string(),
            hostname: Some(challenge.commonname().to_string()),
            restart: Some("unless-stopped".to_string()),
            cap_add: vec!["NET_ADMIN".to_string()],
            devices: vec!["/dev/net/tun".to_string()],
            ports: vec![format!("{}:{}/udp", challenge.port, OPENVPN_CONTAINER_PORT)],
            expose: challenge
                .openvpn_management_port
                .map(|port| vec![port.to_string()])
                .unwrap_or_default(),
            volumes: vec![mount(
                &layout.ovpn_configs.join(name),
                OPENVPN_CONFIG_MOUNT,
                false,
            )],
            environment,
            networks: Vec::new(),
            depends_on: vec![MANAGER_SERVICE.to_string()],
        };

        debug!("Rendered service {} for challenge {}", vpn_service_name(name), name);
        services.insert(vpn_service_name(name), service);
    }

    if config.eve {
        services.insert(EVE_SERVICE.to_string(), eve_service(config));
    }

    ComposeFile {
        version: COMPOSE_VERSION.to_string(),
        services,
        networks,
    }
}

/// Serialises `compose` and writes it to `path`.
pub fn write_compose(path: &Path, compose: &ComposeFile) -> Result<(), RenderError> {
    let yaml = compose.to_yaml()?;
    super::write_rendered(path, &yaml)
}

fn mount(source: &Path, target: &str, read_only: bool) -> String {
    if read_only {
        format!("{}:{}:ro", source.display(), target)
    } else {
        format!("{}:{}", source.display(), target)
    }
}

fn manager_service(config: &RegistryConfig) -> Service {
    Service {
        build: "./manager".to_string(),
        image: "naumachia/manager".to_string(),
        restart: Some("unless-stopped".to_string()),
        cap_add: vec!["NET_ADMIN".to_string()],
        volumes: vec![
            "/var/run/docker.sock:/var/run/docker.sock".to_string(),
            "/proc/1/ns/net:/var/run/netns/host:ro".to_string(),
            mount(&config.challenges_directory, MANAGER_CHALLENGES_MOUNT, true),
        ],
        ..Default::default()
    }
}

fn registrar_service(config: &RegistryConfig, layout: &ComposeLayout) -> Service {
    let registrar = &config.registrar;
    let domain = config.domain.as_deref();

    let mut environment = BTreeMap::new();
    environment.insert(
        "REGISTRAR_TLS_ENABLED".to_string(),
        registrar.tls_enabled.to_string(),
    );
    environment.insert(
        "REGISTRAR_TLS_VERIFY_CLIENT".to_string(),
        registrar.tls_verify_client.to_string(),
    );

    let mut volumes = vec![mount(&layout.ovpn_configs, OPENVPN_CONFIG_MOUNT, false)];

    if registrar.tls_enabled {
        let cn = append_domain(REGISTRAR_SERVICE, domain);
        let ca = append_domain("ca", domain);
        environment.insert(
            "REGISTRAR_CERT".to_string(),
            format!("{}/{}.crt", REGISTRAR_CERTS_MOUNT, cn),
        );
        environment.insert(
            "REGISTRAR_KEY".to_string(),
            format!("{}/{}.key", REGISTRAR_CERTS_MOUNT, cn),
        );
        environment.insert(
            "REGISTRAR_CA".to_string(),
            format!("{}/{}.crt", REGISTRAR_CERTS_MOUNT, ca),
        );
        volumes.push(mount(&layout.registrar_certs, REGISTRAR_CERTS_MOUNT, true));
    }

    // Listing any network drops the implicit project one, which the other
    // services (eve in particular) reach the registrar on
    let networks = if registrar.network == DEFAULT_NETWORK {
        Vec::new()
    } else {
        vec![DEFAULT_NETWORK.to_string(), registrar.network.clone()]
    };

    Service {
        build: "./registrar".to_string(),
        image: "naumachia/registrar".to_string(),
        restart: Some("unless-stopped".to_string()),
        ports: vec![format!("{}:{}", registrar.port, REGISTRAR_CONTAINER_PORT)],
        volumes,
        environment,
        networks,
        ..Default::default()
    }
}

fn eve_service(config: &RegistryConfig) -> Service {
    let mut depends_on: Vec<String> = config
        .challenges
        .keys()
        .map(|name| vpn_service_name(name))
        .collect();

    let mut environment = BTreeMap::new();
    if config.registrar.enabled {
        depends_on.push(REGISTRAR_SERVICE.to_string());
        environment.insert(
            "NAUM_REGISTRAR".to_string(),
            format!("{}:{}", REGISTRAR_SERVICE, REGISTRAR_CONTAINER_PORT),
        );
    }

    Service {
        build: "./test".to_string(),
        image: "naumachia/eve".to_string(),
        cap_add: vec!["NET_ADMIN".to_string()],
        devices: vec!["/dev/net/tun".to_string()],
        environment,
        depends_on,
        ..Default::default()
    }
}
