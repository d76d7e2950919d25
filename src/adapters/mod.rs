//! Builder interfaces for producing firmware binaries.
//!
//! A builder takes the rendered configuration header and produces a build
//! identifier. The production builder shells out to the build script; tests
//! swap in an in-process implementation.

pub mod command;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BuildId, BuildIdError};

pub use command::CommandBuilder;

/// Raw result of running a builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// Everything the builder wrote to stdout
    pub stdout: String,

    /// Exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl BuildOutput {
    pub fn new(stdout: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code,
        }
    }

    /// Successful output carrying `id`
    pub fn success(id: impl Into<String>) -> Self {
        Self::new(id, Some(0))
    }

    /// Turn the raw output into a trustworthy identifier.
    ///
    /// A missing identifier is reported before a failing exit status.
    pub fn into_build_id(self) -> Result<BuildId, BuildError> {
        let id = match BuildId::parse(&self.stdout) {
            Ok(id) => id,
            Err(BuildIdError::Empty) => return Err(BuildError::NoIdentifier),
            Err(BuildIdError::NotAComponent(raw)) => {
                return Err(BuildError::InvalidIdentifier(raw))
            }
        };

        match self.exit_code {
            Some(0) => Ok(id),
            code => Err(BuildError::Failed {
                code,
                identifier: id.to_string(),
            }),
        }
    }
}

/// Errors raised while invoking a builder
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to start builder '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("builder I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("builder output is not valid UTF-8")]
    InvalidUtf8,

    #[error("build produced no identifier")]
    NoIdentifier,

    #[error("build produced an unusable identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("build failed with exit code {code:?} (reported identifier {identifier:?})")]
    Failed {
        code: Option<i32>,
        identifier: String,
    },

    #[error("build timed out after {seconds}s")]
    TimedOut { seconds: u64 },
}

impl BuildError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            BuildError::Spawn { .. } | BuildError::Io(_) | BuildError::InvalidUtf8 => {
                "BUILDER_UNAVAILABLE"
            }
            BuildError::NoIdentifier => "BUILD_NO_IDENTIFIER",
            BuildError::InvalidIdentifier(_) => "BUILD_INVALID_IDENTIFIER",
            BuildError::Failed { .. } => "BUILD_FAILED",
            BuildError::TimedOut { .. } => "BUILD_TIMED_OUT",
        }
    }
}

/// Something that can turn a rendered configuration into a firmware build
#[async_trait]
pub trait Builder: Send + Sync {
    /// Human-readable builder name
    fn name(&self) -> &str;

    /// Run one build, feeding `input` and tagging it with the client address
    async fn run(&self, input: &[u8], client: &str) -> Result<BuildOutput, BuildError>;

    /// Run one build and validate its identifier and exit status
    async fn invoke(&self, input: &[u8], client: &str) -> Result<BuildId, BuildError> {
        self.run(input, client).await?.into_build_id()
    }
}
