//! Processor capability: the domain work invoked per claimed file.
//!
//! The queue treats processing as an opaque side-effecting call. Typically
//! the work is transactional; the queue does not roll the claim back if it
//! fails, so a failed file stays in `working/` until someone looks at it.

use std::future::Future;
use std::path::PathBuf;

use anyhow::Context as _;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Domain work applied to a claimed file.
///
/// Returns `Ok(())` to let the consumer archive the file; any error aborts
/// the archive and propagates out of `accept`.
pub trait Processor: Send + Sync {
    fn process(&self, claimed: PathBuf) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Wrap an async closure as a [`Processor`].
pub fn processor_fn<F, Fut>(f: F) -> ProcessorFn<F>
where
    F: Fn(PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    ProcessorFn(f)
}

/// A [`Processor`] backed by an async closure. Built with [`processor_fn`].
pub struct ProcessorFn<F>(F);

impl<F, Fut> Processor for ProcessorFn<F>
where
    F: Fn(PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    fn process(&self, claimed: PathBuf) -> impl Future<Output = anyhow::Result<()>> + Send {
        (self.0)(claimed)
    }
}

/// Runs an external command per claimed file, with the claimed path appended
/// as the final argument. A non-zero exit status is a processing failure.
pub struct ExecProcessor {
    program: PathBuf,
    args: Vec<String>,
}

impl ExecProcessor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    /// Parse a whitespace-separated command line, e.g. from `--exec`.
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::Config("--exec command is empty".to_string()))?;
        Ok(Self::new(program).args(parts.map(str::to_string)))
    }
}

impl Processor for ExecProcessor {
    async fn process(&self, claimed: PathBuf) -> anyhow::Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&claimed)
            .status()
            .await
            .with_context(|| format!("failed to launch {}", self.program.display()))?;

        if !status.success() {
            anyhow::bail!("{} exited with {status}", self.program.display());
        }
        Ok(())
    }
}
