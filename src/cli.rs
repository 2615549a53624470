use crate::build_driver::{BuildOptions, DEFAULT_DESCRIPTOR_NAMES};
use crate::controller::ConfigureOptions;
use crate::rendering::ComposeLayout;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

/// Command-line interface of the `naumachia` tool.
///
/// Two subcommands are exposed:
/// - `configure`: renders docker-compose and the OpenVPN endpoint files from a challenge
/// registry, and provisions any missing PKI material
/// - `build`: walks a challenge tree and builds every docker-compose descriptor it finds,
/// stopping at the first failure
///
/// Every path option can also be given through a `NAUMACHIA_*` environment variable.
#[derive(Parser, Debug, Clone)]
#[command(name = "naumachia")]
#[command(version)]
#[command(about = "Deployment tooling for Naumachia network challenges")]
pub struct Cli {
    /// Logging verbosity
    #[arg(
        short,
        long,
        global = true,
        value_enum,
        default_value_t = Verbosity::Info,
        env = "NAUMACHIA_VERBOSITY"
    )]
    pub verbosity: Verbosity,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render the deployment from the challenge registry
    Configure(ConfigureArgs),
    /// Build every challenge descriptor under a directory
    Build(BuildArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl Verbosity {
    /// `log` has no level above error, so `critical` shares it.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Critical | Verbosity::Error => LevelFilter::Error,
            Verbosity::Warning => LevelFilter::Warn,
            Verbosity::Info => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ConfigureArgs {
    /// Challenge registry, TOML or YAML by extension
    #[arg(short, long, default_value = "config.toml", env = "NAUMACHIA_CONFIG")]
    pub config: PathBuf,

    /// Where to write the rendered docker-compose file
    #[arg(long, default_value = "docker-compose.yaml", env = "NAUMACHIA_COMPOSE")]
    pub compose: PathBuf,

    /// Directory holding one OpenVPN config directory per challenge
    #[arg(
        long,
        default_value = "./openvpn/config",
        env = "NAUMACHIA_OVPN_CONFIGS"
    )]
    pub ovpn_configs: PathBuf,

    /// Directory for the registrar TLS certificates
    #[arg(
        long,
        default_value = "./registrar/certs",
        env = "NAUMACHIA_REGISTRAR_CERTS"
    )]
    pub registrar_certs: PathBuf,

    /// easyrsa executable; the newest installation under --tools-dir is used otherwise
    #[arg(long, env = "NAUMACHIA_EASYRSA")]
    pub easyrsa: Option<PathBuf>,

    /// Directory holding versioned EasyRSA installations
    #[arg(long, default_value = "tools", env = "NAUMACHIA_TOOLS_DIR")]
    pub tools_dir: PathBuf,

    /// Do not check GitHub for a newer EasyRSA release
    #[arg(long, action = clap::ArgAction::SetTrue, env = "NAUMACHIA_NO_UPDATE_EASYRSA")]
    pub no_update_easyrsa: bool,

    /// Shared Diffie-Hellman parameters [default: <ovpn-configs>/dh.pem]
    #[arg(long, env = "NAUMACHIA_DHPARAM")]
    pub dhparam: Option<PathBuf>,
}

impl ConfigureArgs {
    pub fn into_options(self) -> ConfigureOptions {
        let dhparam = self
            .dhparam
            .unwrap_or_else(|| self.ovpn_configs.join("dh.pem"));
        ConfigureOptions {
            config: self.config,
            compose: self.compose,
            layout: ComposeLayout {
                ovpn_configs: self.ovpn_configs,
                registrar_certs: self.registrar_certs,
            },
            easyrsa: self.easyrsa,
            tools_dir: self.tools_dir,
            update_easyrsa: !self.no_update_easyrsa,
            dhparam,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Root of the challenge tree
    #[arg(default_value = "challenges")]
    pub root: PathBuf,

    /// Build tool, run as `<tool> -f <descriptor> build`
    #[arg(long, default_value = "docker-compose", env = "NAUMACHIA_BUILD_TOOL")]
    pub tool: PathBuf,

    /// Descriptor file name to look for, may be repeated
    #[arg(long = "descriptor", value_name = "NAME")]
    pub descriptors: Vec<String>,

    /// Print the build commands without running them
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Extra arguments passed to every build, after `--`
    #[arg(last = true)]
    pub build_args: Vec<String>,
}

impl BuildArgs {
    pub fn into_options(self) -> BuildOptions {
        let descriptor_names = if self.descriptors.is_empty() {
            DEFAULT_DESCRIPTOR_NAMES.iter().map(|s| s.to_string()).collect()
        } else {
            self.descriptors
        };
        BuildOptions {
            tool: self.tool,
            descriptor_names,
            extra_args: self.build_args,
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn configure(args: &[&str]) -> ConfigureArgs {
        let mut argv = vec!["naumachia", "configure"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Configure(args) => args,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    fn build(args: &[&str]) -> BuildArgs {
        let mut argv = vec!["naumachia", "build"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Build(args) => args,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_configure_defaults() {
        let options = configure(&[]).into_options();
        assert_eq!(options, ConfigureOptions::default());
    }

    #[test]
    #[serial]
    fn test_configure_dhparam_follows_ovpn_configs() {
        let options = configure(&["--ovpn-configs", "/srv/ovpn"]).into_options();
        assert_eq!(options.layout.ovpn_configs, PathBuf::from("/srv/ovpn"));
        assert_eq!(options.dhparam, PathBuf::from("/srv/ovpn/dh.pem"));

        let options =
            configure(&["--ovpn-configs", "/srv/ovpn", "--dhparam", "/tmp/dh.pem"]).into_options();
        assert_eq!(options.dhparam, PathBuf::from("/tmp/dh.pem"));
    }

    #[test]
    #[serial]
    fn test_configure_easyrsa_update_switch() {
        assert!(configure(&[]).into_options().update_easyrsa);
        assert!(!configure(&["--no-update-easyrsa"]).into_options().update_easyrsa);
    }

    #[test]
    fn test_configure_help_documents_every_option() {
        let mut command = <Cli as clap::CommandFactory>::command();
        let configure = command.find_subcommand_mut("configure").unwrap();
        for arg in configure.get_arguments() {
            if matches!(arg.get_id().as_str(), "help" | "verbosity") {
                continue;
            }
            assert!(
                arg.get_help().is_some(),
                "--{} has no help text",
                arg.get_id()
            );
        }
    }

    #[test]
    #[serial]
    fn test_configure_from_env() {
        std::env::set_var("NAUMACHIA_CONFIG", "/etc/naumachia/config.yml");
        std::env::set_var("NAUMACHIA_EASYRSA", "/opt/easyrsa/easyrsa");
        let options = configure(&[]).into_options();
        std::env::remove_var("NAUMACHIA_CONFIG");
        std::env::remove_var("NAUMACHIA_EASYRSA");

        assert_eq!(options.config, PathBuf::from("/etc/naumachia/config.yml"));
        assert_eq!(options.easyrsa, Some(PathBuf::from("/opt/easyrsa/easyrsa")));
    }

    #[test]
    #[serial]
    fn test_build_defaults() {
        let args = build(&[]);
        assert_eq!(args.root, PathBuf::from("challenges"));
        assert_eq!(args.into_options(), BuildOptions::default());
    }

    #[test]
    #[serial]
    fn test_build_options() {
        let options = build(&[
            "/srv/challenges",
            "--tool",
            "docker",
            "--descriptor",
            "compose.yml",
            "--dry-run",
            "--",
            "--pull",
            "--no-cache",
        ])
        .into_options();

        assert_eq!(options.tool, PathBuf::from("docker"));
        assert_eq!(options.descriptor_names, vec!["compose.yml"]);
        assert_eq!(options.extra_args, vec!["--pull", "--no-cache"]);
        assert!(options.dry_run);
    }

    #[test]
    #[serial]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["naumachia", "build", "-v", "debug"]).unwrap();
        assert_eq!(cli.verbosity.level_filter(), LevelFilter::Debug);

        let cli = Cli::try_parse_from(["naumachia", "--verbosity", "critical", "build"]).unwrap();
        assert_eq!(cli.verbosity.level_filter(), LevelFilter::Error);

        assert!(Cli::try_parse_from(["naumachia", "-v", "loud", "build"]).is_err());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["naumachia"]).is_err());
    }
}
