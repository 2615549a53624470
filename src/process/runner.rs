use super::invocation::{CommandOutcome, Invocation};
use crate::error_handling::types::CommandError;
use log::{debug, error, warn};
use std::future::Future;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;

/// Executes [`Invocation`]s.
///
/// A non-zero exit is not an error at this level: it is reported through
/// [`CommandOutcome::code`] and the caller decides what failure means.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        invocation: &Invocation,
    ) -> impl Future<Output = Result<CommandOutcome, CommandError>> + Send;
}

/// Runs commands on the host with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutcome, CommandError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);

        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }

        if invocation.stdin.is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }

        if invocation.inherit_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        debug!("Running: {}", invocation);
        let mut child = cmd.spawn().map_err(|e| {
            error!("Failed to spawn {}: {}", invocation, e);
            CommandError::SpawnFailed(invocation.to_string(), e)
        })?;

        let tag = invocation.program_name();
        let stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(collect_lines(out, tag.clone(), "stdout")));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(collect_lines(err, tag.clone(), "stderr")));

        // Readers are running, so a child that writes before reading stdin cannot block
        if let (Some(input), Some(mut stdin)) = (&invocation.stdin, child.stdin.take()) {
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                warn!("Failed to write stdin of {}: {}", invocation, e);
            }
            // stdin is dropped here so the child sees EOF
        }

        let status = child.wait().await?;

        let stdout = match stdout_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        debug!("{} exited with {:?}", tag, status.code());
        Ok(CommandOutcome {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

/// Reads `stream` line by line, logging each line and returning them all.
async fn collect_lines<R>(stream: R, tag: String, channel: &'static str) -> String
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream).lines();
    let mut collected = String::new();
    while let Ok(Some(line)) = reader.next_line().await {
        debug!("[{}][{}] {}", tag, channel, line);
        collected.push_str(&line);
        collected.push('\n');
    }
    collected
}

/// Runner for tests: records every invocation instead of executing it.
#[cfg(test)]
pub struct RecordingRunner {
    invocations: std::sync::Mutex<Vec<Invocation>>,
    failures: Vec<(String, i32)>,
    dir_failures: Vec<(std::path::PathBuf, i32)>,
    effect: Option<Box<dyn Fn(&Invocation) + Send + Sync>>,
}

#[cfg(test)]
impl RecordingRunner {
    pub fn new() -> Self {
        Self {
            invocations: std::sync::Mutex::new(Vec::new()),
            failures: Vec::new(),
            dir_failures: Vec::new(),
            effect: None,
        }
    }

    /// Commands whose rendered line contains `needle` exit with `code`.
    pub fn fail_when(mut self, needle: &str, code: i32) -> Self {
        self.failures.push((needle.to_string(), code));
        self
    }

    /// Commands run from `dir` exit with `code`.
    pub fn fail_in<P: AsRef<std::path::Path>>(mut self, dir: P, code: i32) -> Self {
        self.dir_failures.push((dir.as_ref().to_path_buf(), code));
        self
    }

    /// Side effect applied for every command, standing in for what the real
    /// tool would have left on disk.
    pub fn with_effect<F>(mut self, effect: F) -> Self
    where
        F: Fn(&Invocation) + Send + Sync + 'static,
    {
        self.effect = Some(Box::new(effect));
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(|invocation| invocation.to_string())
            .collect()
    }
}

#[cfg(test)]
impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutcome, CommandError> {
        self.invocations.lock().unwrap().push(invocation.clone());

        if let Some(effect) = &self.effect {
            effect(invocation);
        }

        for (dir, code) in &self.dir_failures {
            if invocation.cwd.as_deref() == Some(dir.as_path()) {
                return Ok(CommandOutcome::failure(*code));
            }
        }

        let line = invocation.to_string();
        for (needle, code) in &self.failures {
            if line.contains(needle.as_str()) {
                return Ok(CommandOutcome::failure(*code));
            }
        }
        Ok(CommandOutcome::success())
    }
}
