//! Builder backed by an external build script.
//!
//! The script is spawned as `<program> <client-address>`, receives the
//! rendered header on stdin, and prints the build identifier on stdout. It
//! creates the artifact directory itself.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{BuildError, BuildOutput, Builder};

/// Builder that runs an external command
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    /// Program to run (default: "./buildme.sh")
    program: PathBuf,

    /// Directory the program runs in
    working_dir: Option<PathBuf>,

    /// Upper bound on a single build; unbounded when `None`
    timeout: Option<Duration>,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new("./buildme.sh")
    }
}

impl CommandBuilder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Run the program from `dir` instead of the current directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Relative program paths like `./buildme.sh` are taken from the working dir
    fn resolved_program(&self) -> PathBuf {
        match &self.working_dir {
            Some(dir) if self.program.is_relative() && self.program.components().count() > 1 => {
                dir.join(&self.program)
            }
            _ => self.program.clone(),
        }
    }
}

#[async_trait]
impl Builder for CommandBuilder {
    fn name(&self) -> &str {
        "command"
    }

    async fn run(&self, input: &[u8], client: &str) -> Result<BuildOutput, BuildError> {
        let mut command = Command::new(self.resolved_program());
        command
            .arg(client)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| BuildError::Spawn {
            command: self.program.display().to_string(),
            source,
        })?;

        // Feed stdin from its own task while the output pipes are drained;
        // a script may write plenty before it reads its header
        let feeder = child.stdin.take().map(|mut stdin| {
            let input = input.to_vec();
            tokio::spawn(async move {
                match stdin.write_all(&input).await {
                    // Script exited without reading its input; its exit status tells the rest
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                    result => result,
                }
            })
        });

        let waited = match self.timeout {
            Some(limit) => timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| BuildError::TimedOut {
                    seconds: limit.as_secs(),
                }),
            None => Ok(child.wait_with_output().await),
        };
        let output = match waited {
            Ok(output) => output?,
            Err(e) => {
                if let Some(feeder) = &feeder {
                    feeder.abort();
                }
                return Err(e);
            }
        };

        if let Some(feeder) = feeder {
            feeder
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| BuildError::InvalidUtf8)?;
        let exit_code = output.status.code();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                program = %self.program.display(),
                ?exit_code,
                stderr = %stderr.trim(),
                "Build script exited unsuccessfully"
            );
        } else {
            debug!(program = %self.program.display(), stdout = %stdout.trim(), "Build script finished");
        }

        Ok(BuildOutput::new(stdout, exit_code))
    }
}
