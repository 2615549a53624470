use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    YamlError(String),
    ChallengesEmpty(String),
    BadChallengeName(String),
    BadPort(String),
    DuplicatePort(String),
    DuplicateInterface(String),
    BadClientName(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::YamlError(e) => write!(f, "YAML parsing error: {}", e),
            ConfigError::ChallengesEmpty(e) => write!(f, "Challenges configuration error: {}", e),
            ConfigError::BadChallengeName(e) => write!(f, "Challenge name error: {}", e),
            ConfigError::BadPort(e) => write!(f, "Port error: {}", e),
            ConfigError::DuplicatePort(e) => write!(f, "Duplicate port: {}", e),
            ConfigError::DuplicateInterface(e) => write!(f, "Duplicate interface name: {}", e),
            ConfigError::BadClientName(e) => write!(f, "TLS client name error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum RenderError {
    SerializeFailed(String),
    WriteFailed(PathBuf, std::io::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::SerializeFailed(e) => write!(f, "Serialization failed: {}", e),
            RenderError::WriteFailed(path, e) => {
                write!(f, "Failed to write {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for RenderError {}

#[derive(Debug)]
pub enum CommandError {
    SpawnFailed(String, std::io::Error),
    IoError(std::io::Error),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::SpawnFailed(program, e) => {
                write!(f, "Failed to spawn '{}': {}", program, e)
            }
            CommandError::IoError(e) => write!(f, "Command IO error: {}", e),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::IoError(err)
    }
}

#[derive(Debug)]
pub enum ProvisionError {
    EasyRsaNotFound(PathBuf),
    CommandFailed { command: String, code: Option<i32> },
    Command(CommandError),
    IoError(std::io::Error),
    ReleaseFailed(String),
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionError::EasyRsaNotFound(dir) => {
                write!(f, "No easyrsa installation found in {}", dir.display())
            }
            ProvisionError::CommandFailed { command, code } => match code {
                Some(code) => write!(f, "Command '{}' failed with exit code {}", command, code),
                None => write!(f, "Command '{}' was terminated by a signal", command),
            },
            ProvisionError::Command(e) => write!(f, "{}", e),
            ProvisionError::IoError(e) => write!(f, "Provisioning IO error: {}", e),
            ProvisionError::ReleaseFailed(e) => write!(f, "EasyRSA release error: {}", e),
        }
    }
}

impl std::error::Error for ProvisionError {}

impl From<std::io::Error> for ProvisionError {
    fn from(err: std::io::Error) -> Self {
        ProvisionError::IoError(err)
    }
}

impl From<CommandError> for ProvisionError {
    fn from(err: CommandError) -> Self {
        ProvisionError::Command(err)
    }
}

impl From<reqwest::Error> for ProvisionError {
    fn from(err: reqwest::Error) -> Self {
        ProvisionError::ReleaseFailed(err.to_string())
    }
}

#[derive(Debug)]
pub enum BuildError {
    RootNotFound(PathBuf),
    WalkFailed(PathBuf, std::io::Error),
    BuildFailed { descriptor: PathBuf, code: Option<i32> },
    Command(CommandError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::RootNotFound(root) => {
                write!(f, "Build root {} does not exist", root.display())
            }
            BuildError::WalkFailed(dir, e) => {
                write!(f, "Failed to read directory {}: {}", dir.display(), e)
            }
            BuildError::BuildFailed { descriptor, code } => match code {
                Some(code) => write!(
                    f,
                    "Build of {} failed with exit code {}",
                    descriptor.display(),
                    code
                ),
                None => write!(
                    f,
                    "Build of {} was terminated by a signal",
                    descriptor.display()
                ),
            },
            BuildError::Command(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<CommandError> for BuildError {
    fn from(err: CommandError) -> Self {
        BuildError::Command(err)
    }
}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    RenderError(RenderError),
    ProvisionError(ProvisionError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::RenderError(e) => write!(f, "Render error: {}", e),
            ControllerError::ProvisionError(e) => write!(f, "Provisioning error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<RenderError> for ControllerError {
    fn from(err: RenderError) -> Self {
        ControllerError::RenderError(err)
    }
}

impl From<ProvisionError> for ControllerError {
    fn from(err: ProvisionError) -> Self {
        ControllerError::ProvisionError(err)
    }
}
