use crate::error::{ConversionError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Exit status LibreOffice returns when it loses its startup race. Worth one retry.
pub const RECOVERABLE_EXIT_CODE: i32 = 81;

/// Result of a single converter run
#[derive(Debug)]
pub enum ConversionOutcome {
    /// Output written next to the input, in the output directory
    Success,
    /// Known transient failure
    Recoverable { status: i32 },
    /// Genuine failure, retrying will not help
    Fatal(ConversionError),
}

impl ConversionOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(0) => Self::Success,
            Some(RECOVERABLE_EXIT_CODE) => Self::Recoverable {
                status: RECOVERABLE_EXIT_CODE,
            },
            Some(code) => Self::Fatal(ConversionError::ConverterFailed { status: code }),
            None => Self::Fatal(ConversionError::ConverterAborted {
                reason: status.to_string(),
            }),
        }
    }
}

/// Trait for document rendering engines
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert `input` to `target_format`. Only a failure to run the engine at all is an `Err`.
    async fn convert(&self, input: &Path, target_format: &str) -> Result<ConversionOutcome>;

    /// Check if the engine is installed
    async fn health_check(&self) -> bool;
}

/// Headless LibreOffice invoked as a child process.
pub struct LibreOfficeConverter {
    program: PathBuf,
    output_dir: PathBuf,
    timeout: Duration,
}

impl LibreOfficeConverter {
    pub fn new(program: PathBuf, output_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            program,
            output_dir,
            timeout,
        }
    }

    fn command(&self, input: &Path, target_format: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args([
            "--headless",
            "--invisible",
            "--nodefault",
            "--nofirststartwizard",
            "--nolockcheck",
            "--nologo",
            "--norestore",
            "--writer",
            "--convert-to",
            target_format,
            "--outdir",
        ])
        .arg(&self.output_dir)
        .arg(input)
        // The engine writes its profile under HOME, which is read-only outside the scratch dir.
        .env("HOME", &self.output_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl DocumentConverter for LibreOfficeConverter {
    async fn convert(&self, input: &Path, target_format: &str) -> Result<ConversionOutcome> {
        tracing::debug!(
            "Running {} on {} (target: {})",
            self.program.display(),
            input.display(),
            target_format
        );

        let child = self
            .command(input, target_format)
            .spawn()
            .map_err(|source| ConversionError::ConverterLaunch {
                program: self.program.clone(),
                source,
            })?;

        // Dropping the pending future on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                tracing::error!(
                    "Converter exceeded {}s on {}, killed",
                    self.timeout.as_secs(),
                    input.display()
                );
                return Ok(ConversionOutcome::Fatal(ConversionError::ConverterTimeout {
                    secs: self.timeout.as_secs(),
                }));
            }
        };

        if !output.status.success() {
            let err_msg = String::from_utf8_lossy(&output.stderr);
            tracing::error!("Converter exited with {}: {}", output.status, err_msg.trim());
        }

        Ok(ConversionOutcome::from_status(output.status))
    }

    async fn health_check(&self) -> bool {
        tokio::fs::metadata(&self.program)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }
}

/// Run the converter, retrying exactly once on the recoverable status.
pub async fn convert_with_retry(
    converter: &dyn DocumentConverter,
    input: &Path,
    target_format: &str,
) -> Result<()> {
    match converter.convert(input, target_format).await? {
        ConversionOutcome::Success => {
            tracing::info!("Conversion successful.");
            Ok(())
        }
        ConversionOutcome::Recoverable { status } => {
            tracing::warn!("Conversion failed with status {}, retrying once.", status);
            match converter.convert(input, target_format).await? {
                ConversionOutcome::Success => {
                    tracing::info!("Conversion successful on retry.");
                    Ok(())
                }
                ConversionOutcome::Recoverable { status }
                | ConversionOutcome::Fatal(ConversionError::ConverterFailed { status }) => {
                    Err(ConversionError::RetryFailed { status })
                }
                ConversionOutcome::Fatal(e) => Err(e),
            }
        }
        ConversionOutcome::Fatal(e) => Err(e),
    }
}
