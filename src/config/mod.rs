use crate::error::{ConversionError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default LibreOffice binary shipped in the conversion layer.
pub const DEFAULT_SOFFICE_PATH: &str = "/usr/local/lib/libreoffice/program/soffice.bin";

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Destination bucket for converted documents (`OutputBucket`, required)
    pub output_bucket: String,

    /// Keep source objects after conversion (`KEEP_FILES`, any non-empty value)
    pub keep_files: bool,

    /// Numeric log level, 10 = debug .. 40 = error (`LoggingLevel`, default: 40)
    pub logging_level: u32,

    /// Rendering engine executable (`SOFFICE_PATH`)
    pub soffice_path: PathBuf,

    /// Local working directory, also used as the engine's HOME (`SCRATCH_DIR`, default: "/tmp")
    pub scratch_dir: PathBuf,

    /// Converter wall-clock limit in seconds (`CONVERSION_TIMEOUT_SECS`, default: 300)
    pub conversion_timeout_secs: u64,

    /// Custom S3 endpoint such as MinIO (`S3_ENDPOINT`)
    pub s3_endpoint: Option<String>,

    /// Region used when the environment provides none (`AWS_REGION`, default: "us-east-1")
    pub aws_region: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            output_bucket: String::new(),
            keep_files: false,
            logging_level: 40,
            soffice_path: PathBuf::from(DEFAULT_SOFFICE_PATH),
            scratch_dir: PathBuf::from("/tmp"),
            conversion_timeout_secs: 300,
            s3_endpoint: None,
            aws_region: "us-east-1".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let output_bucket = lookup("OutputBucket")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConversionError::Config("OutputBucket must be set".to_string()))?;

        Ok(Self {
            output_bucket,

            keep_files: lookup("KEEP_FILES").is_some_and(|v| !v.is_empty()),

            logging_level: lookup("LoggingLevel")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default.logging_level),

            soffice_path: lookup("SOFFICE_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.soffice_path),

            scratch_dir: lookup("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.scratch_dir),

            conversion_timeout_secs: lookup("CONVERSION_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.conversion_timeout_secs),

            s3_endpoint: lookup("S3_ENDPOINT").filter(|v| !v.is_empty()),

            aws_region: lookup("AWS_REGION").unwrap_or(default.aws_region),
        })
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }

    /// Map the numeric level onto a tracing filter directive.
    pub fn log_directive(&self) -> &'static str {
        match self.logging_level {
            0..=10 => "debug",
            11..=20 => "info",
            21..=30 => "warn",
            _ => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert!(!config.keep_files);
        assert_eq!(config.logging_level, 40);
        assert_eq!(config.conversion_timeout(), Duration::from_secs(300));
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp"));
        assert_eq!(config.log_directive(), "error");
    }

    #[test]
    fn test_output_bucket_required() {
        let result = WorkerConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConversionError::Config(_))));

        let result = WorkerConfig::from_lookup(lookup_from(&[("OutputBucket", "")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_keep_files_requires_non_empty_value() {
        let config =
            WorkerConfig::from_lookup(lookup_from(&[("OutputBucket", "out"), ("KEEP_FILES", "")]))
                .unwrap();
        assert!(!config.keep_files);

        let config =
            WorkerConfig::from_lookup(lookup_from(&[("OutputBucket", "out"), ("KEEP_FILES", "0")]))
                .unwrap();
        assert!(config.keep_files);
    }

    #[test]
    fn test_overrides() {
        let config = WorkerConfig::from_lookup(lookup_from(&[
            ("OutputBucket", "converted"),
            ("LoggingLevel", "20"),
            ("SCRATCH_DIR", "/var/scratch"),
            ("CONVERSION_TIMEOUT_SECS", "30"),
            ("S3_ENDPOINT", "http://127.0.0.1:9000"),
        ]))
        .unwrap();
        assert_eq!(config.output_bucket, "converted");
        assert_eq!(config.log_directive(), "info");
        assert_eq!(config.scratch_dir, PathBuf::from("/var/scratch"));
        assert_eq!(config.conversion_timeout_secs, 30);
        assert_eq!(config.s3_endpoint.as_deref(), Some("http://127.0.0.1:9000"));
    }

    #[test]
    fn test_log_directive_levels() {
        let mut config = WorkerConfig::default();
        config.logging_level = 10;
        assert_eq!(config.log_directive(), "debug");
        config.logging_level = 30;
        assert_eq!(config.log_directive(), "warn");
        config.logging_level = 50;
        assert_eq!(config.log_directive(), "error");
    }
}
