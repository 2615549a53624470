use super::compose::OPENVPN_CONTAINER_PORT;
use crate::configuration::ChallengeConfig;

const SCRIPTS_DIR: &str = "/scripts/naumachia";
const PKI_DIR: &str = "/etc/openvpn/pki";

/// Quotes `value` for a POSIX shell, so it survives `source`-ing unchanged.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Server configuration for the bridged endpoint of challenge `name`.
///
/// Clients land on a TAP bridge; VLAN tags assigned by the manager in the
/// connect hook keep each user on their own copy of the challenge network.
pub fn render_openvpn_conf(name: &str, challenge: &ChallengeConfig) -> String {
    let cn = challenge.commonname();
    let management = match challenge.openvpn_management_port {
        Some(port) => format!("management 0.0.0.0 {}\n", port),
        None => String::new(),
    };

    format!(
        r#"# OpenVPN server for challenge {name}
server-bridge
proto udp
port {port}
dev tap0
dev-type tap

ca {pki}/ca.crt
cert {pki}/issued/{cn}.crt
key {pki}/private/{cn}.key
dh {pki}/dh.pem
crl-verify {pki}/crl.pem

vlan-tagging
vlan-accept tagged

keepalive 10 60
persist-key
persist-tun
user nobody
group nogroup

script-security 2
up {scripts}/register_challenge.py
client-connect {scripts}/client_connect.py
client-disconnect {scripts}/client_disconnect.py

status /tmp/openvpn-status.log
verb 3
{management}"#,
        name = name,
        port = OPENVPN_CONTAINER_PORT,
        pki = PKI_DIR,
        cn = cn,
        scripts = SCRIPTS_DIR,
        management = management,
    )
}

/// Environment sourced by the endpoint container entrypoint.
pub fn render_ovpn_env(name: &str, challenge: &ChallengeConfig) -> String {
    let cn = challenge.commonname();
    let mut lines = vec![
        format!("declare -x NAUM_CHAL={}", shell_quote(name)),
        format!("declare -x OVPN_CN={}", shell_quote(cn)),
        format!("declare -x OVPN_PORT={}", challenge.port),
        "declare -x OVPN_PROTO=udp".to_string(),
        "declare -x OVPN_DEVICE=tap".to_string(),
        format!(
            "declare -x OVPN_SERVER_URL={}",
            shell_quote(&format!("udp://{}:{}", cn, challenge.port))
        ),
    ];

    if let Some(port) = challenge.openvpn_management_port {
        lines.push(format!("declare -x OVPN_MANAGEMENT_PORT={}", port));
    }

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}
