use super::discovery::{discover_descriptors, DEFAULT_DESCRIPTOR_NAMES};
use crate::error_handling::types::BuildError;
use crate::process::{CommandRunner, Invocation};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

/// How descriptors are found and what is run for each of them.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Build tool, invoked as `<tool> -f <descriptor> build [extra_args...]`
    pub tool: PathBuf,
    pub descriptor_names: Vec<String>,
    pub extra_args: Vec<String>,
    /// Log the commands without running them
    pub dry_run: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            tool: PathBuf::from("docker-compose"),
            descriptor_names: DEFAULT_DESCRIPTOR_NAMES.iter().map(|s| s.to_string()).collect(),
            extra_args: Vec::new(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    /// Descriptors built (or, in a dry run, that would have been), in order
    pub built: Vec<PathBuf>,
    pub dry_run: bool,
}

pub struct BuildDriver<R: CommandRunner> {
    runner: R,
    options: BuildOptions,
}

impl<R: CommandRunner> BuildDriver<R> {
    pub fn new(runner: R, options: BuildOptions) -> Self {
        Self { runner, options }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// The build command for one descriptor. It runs from the descriptor's
    /// directory so relative build contexts resolve the same way as by hand,
    /// which means `-f` only gets the file name.
    pub fn invocation_for(&self, descriptor: &Path) -> Invocation {
        let parent = descriptor.parent().filter(|p| !p.as_os_str().is_empty());
        let file = match (parent, descriptor.file_name()) {
            (Some(_), Some(name)) => Path::new(name),
            _ => descriptor,
        };

        let mut invocation = Invocation::new(&self.options.tool)
            .arg("-f")
            .arg(file.display().to_string())
            .arg("build")
            .args(self.options.extra_args.iter().cloned())
            .inherit_output();

        if let Some(parent) = parent {
            invocation = invocation.current_dir(parent);
        }
        invocation
    }

    /// Builds every descriptor under `root`, in sorted order.
    ///
    /// # Errors
    /// - [`BuildError::RootNotFound`] / [`BuildError::WalkFailed`] if the tree
    ///   cannot be walked.
    /// - [`BuildError::BuildFailed`] for the first build exiting non-zero; later
    ///   descriptors are not attempted.
    /// - [`BuildError::Command`] if the build tool cannot be started.
    pub async fn run(&self, root: &Path) -> Result<BuildReport, BuildError> {
        let descriptors = discover_descriptors(root, &self.options.descriptor_names)?;
        info!(
            "Found {} build descriptors under {}",
            descriptors.len(),
            root.display()
        );
        if descriptors.is_empty() {
            warn!("Nothing to build under {}", root.display());
        }

        let mut report = BuildReport {
            built: Vec::with_capacity(descriptors.len()),
            dry_run: self.options.dry_run,
        };

        for descriptor in descriptors {
            let invocation = self.invocation_for(&descriptor);

            if self.options.dry_run {
                info!("[dry-run] {}: {}", descriptor.display(), invocation);
                report.built.push(descriptor);
                continue;
            }

            info!("Building {}", descriptor.display());
            let outcome = self.runner.run(&invocation).await?;
            if !outcome.is_success() {
                error!(
                    "Build of {} failed with exit code {:?}, stopping",
                    descriptor.display(),
                    outcome.code
                );
                return Err(BuildError::BuildFailed {
                    descriptor,
                    code: outcome.code,
                });
            }
            report.built.push(descriptor);
        }

        info!("Built {} descriptors", report.built.len());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::runner::RecordingRunner;
    use serial_test::serial;
    use tempfile::TempDir;

    fn tree() -> (TempDir, Vec<PathBuf>) {
        let dir = TempDir::new().unwrap();
        let mut descriptors = Vec::new();
        for name in ["a", "b", "c"] {
            let chal = dir.path().join(name);
            std::fs::create_dir(&chal).unwrap();
            let descriptor = chal.join("docker-compose.yml");
            std::fs::write(&descriptor, "services: {}\n").unwrap();
            descriptors.push(descriptor);
        }
        (dir, descriptors)
    }

    #[test]
    fn test_invocation_shape() {
        let options = BuildOptions {
            extra_args: vec!["--pull".to_string()],
            ..Default::default()
        };
        let driver = BuildDriver::new(RecordingRunner::new(), options);

        let invocation = driver.invocation_for(Path::new("/srv/challenges/middle/docker-compose.yml"));

        assert_eq!(
            invocation.to_string(),
            "docker-compose -f docker-compose.yml build --pull"
        );
        assert_eq!(
            invocation.cwd,
            Some(PathBuf::from("/srv/challenges/middle"))
        );
        assert!(invocation.inherit_output);
    }

    #[tokio::test]
    async fn test_builds_in_order() {
        let (dir, descriptors) = tree();
        let driver = BuildDriver::new(RecordingRunner::new(), BuildOptions::default());

        let report = driver.run(dir.path()).await.unwrap();

        assert_eq!(report.built, descriptors);
        assert!(!report.dry_run);
        let invocations = driver.runner().invocations();
        assert_eq!(invocations.len(), 3);
        for (invocation, descriptor) in invocations.iter().zip(&descriptors) {
            assert_eq!(invocation.cwd.as_deref(), descriptor.parent());
            assert_eq!(invocation.args[1], "docker-compose.yml");
        }
    }

    #[tokio::test]
    async fn test_stops_on_first_failure() {
        let (dir, descriptors) = tree();
        let driver = BuildDriver::new(
            RecordingRunner::new().fail_in(descriptors[1].parent().unwrap(), 2),
            BuildOptions::default(),
        );

        let err = driver.run(dir.path()).await.unwrap_err();

        match err {
            BuildError::BuildFailed { descriptor, code } => {
                assert_eq!(descriptor, descriptors[1]);
                assert_eq!(code, Some(2));
            }
            other => panic!("unexpected error: {}", other),
        }
        // The third descriptor is never attempted
        assert_eq!(driver.runner().invocations().len(), 2);
    }

    #[tokio::test]
    async fn test_dry_run_executes_nothing() {
        let (dir, descriptors) = tree();
        let options = BuildOptions {
            dry_run: true,
            ..Default::default()
        };
        let driver = BuildDriver::new(RecordingRunner::new(), options);

        let report = driver.run(dir.path()).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.built, descriptors);
        assert!(driver.runner().invocations().is_empty());
    }

    #[test]
    fn test_invocation_for_bare_file_name() {
        let driver = BuildDriver::new(RecordingRunner::new(), BuildOptions::default());

        let invocation = driver.invocation_for(Path::new("docker-compose.yml"));

        assert_eq!(invocation.args[..2], ["-f", "docker-compose.yml"]);
        assert_eq!(invocation.cwd, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_relative_root_resolves_descriptors() {
        use crate::process::SystemRunner;
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let chal = dir.path().join("challenges/middle");
        std::fs::create_dir_all(&chal).unwrap();
        std::fs::write(chal.join("docker-compose.yml"), "services: {}\n").unwrap();

        // Succeeds only if the `-f` argument names a file from its working directory
        let tool = dir.path().join("fake-compose");
        std::fs::write(&tool, "#!/bin/sh\n[ \"$1\" = -f ] && [ -f \"$2\" ]\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let options = BuildOptions {
            tool,
            ..Default::default()
        };
        let result = BuildDriver::new(SystemRunner, options)
            .run(Path::new("challenges"))
            .await;
        std::env::set_current_dir(previous).unwrap();

        let report = result.unwrap();
        assert_eq!(
            report.built,
            vec![PathBuf::from("challenges/middle/docker-compose.yml")]
        );
    }

    #[tokio::test]
    async fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let driver = BuildDriver::new(RecordingRunner::new(), BuildOptions::default());
        let err = driver.run(&dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, BuildError::RootNotFound(_)));
    }
}
