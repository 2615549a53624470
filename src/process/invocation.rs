use std::fmt;
use std::path::{Path, PathBuf};

/// A single external command: program, arguments, working directory and
/// optional standard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub stdin: Option<String>,
    /// Let the child write straight to our stdout/stderr instead of capturing
    pub inherit_output: bool,
}

impl Invocation {
    pub fn new<P: AsRef<Path>>(program: P) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
            inherit_output: false,
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn stdin<S: Into<String>>(mut self, input: S) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn inherit_output(mut self) -> Self {
        self.inherit_output = true;
        self
    }

    /// Program file name, used to tag log lines.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Exit status and captured output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    /// `None` when the child was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            ..Default::default()
        }
    }

    pub fn failure(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_display() {
        let invocation = Invocation::new("/opt/EasyRSA-3.1.0/easyrsa")
            .arg("build-server-full")
            .args(["middle", "nopass"])
            .current_dir("/tmp/pki")
            .stdin("ca.middle\n");

        assert_eq!(
            invocation.to_string(),
            "/opt/EasyRSA-3.1.0/easyrsa build-server-full middle nopass"
        );
        assert_eq!(invocation.program_name(), "easyrsa");
        assert_eq!(invocation.cwd, Some(PathBuf::from("/tmp/pki")));
        assert_eq!(invocation.stdin.as_deref(), Some("ca.middle\n"));
        assert!(!invocation.inherit_output);
    }

    #[test]
    fn test_outcome_status() {
        assert!(CommandOutcome::success().is_success());
        assert!(!CommandOutcome::failure(2).is_success());
        assert!(!CommandOutcome::default().is_success());
    }
}
