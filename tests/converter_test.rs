#![cfg(unix)]

use doc_converter::error::ConversionError;
use doc_converter::services::converter::{
    ConversionOutcome, DocumentConverter, LibreOfficeConverter, convert_with_retry,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Write an executable shell script standing in for soffice.
fn fake_engine(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn input_file(dir: &Path) -> PathBuf {
    let input = dir.join("essay.docx");
    std::fs::write(&input, b"essay").unwrap();
    input
}

#[tokio::test]
async fn test_engine_success_writes_output() {
    let bin = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    // Last argument is the input; HOME must match the --outdir value.
    let engine = fake_engine(
        bin.path(),
        "soffice.bin",
        r#"while [ $# -gt 1 ]; do
  [ "$1" = "--outdir" ] && outdir=$2
  shift
done
[ "$HOME" = "$outdir" ] || exit 3
base=$(basename "$1")
cp "$1" "$outdir/${base%.*}.pdf""#,
    );
    let input = input_file(scratch.path());

    let converter = LibreOfficeConverter::new(
        engine,
        scratch.path().to_path_buf(),
        Duration::from_secs(10),
    );
    assert!(converter.health_check().await);

    let outcome = converter.convert(&input, "pdf").await.unwrap();
    assert!(matches!(outcome, ConversionOutcome::Success));
    assert_eq!(
        std::fs::read(scratch.path().join("essay.pdf")).unwrap(),
        b"essay"
    );
}

#[tokio::test]
async fn test_engine_recoverable_status() {
    let bin = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let engine = fake_engine(bin.path(), "soffice.bin", "exit 81");
    let input = input_file(scratch.path());

    let converter = LibreOfficeConverter::new(
        engine,
        scratch.path().to_path_buf(),
        Duration::from_secs(10),
    );

    let outcome = converter.convert(&input, "pdf").await.unwrap();
    assert!(matches!(outcome, ConversionOutcome::Recoverable { status: 81 }));

    let result = convert_with_retry(&converter, &input, "pdf").await;
    assert!(matches!(result, Err(ConversionError::RetryFailed { status: 81 })));
}

#[tokio::test]
async fn test_engine_fatal_status() {
    let bin = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let engine = fake_engine(
        bin.path(),
        "soffice.bin",
        "echo 'source file could not be loaded' >&2\nexit 1",
    );
    let input = input_file(scratch.path());

    let converter = LibreOfficeConverter::new(
        engine,
        scratch.path().to_path_buf(),
        Duration::from_secs(10),
    );

    let result = convert_with_retry(&converter, &input, "pdf").await;
    assert!(matches!(result, Err(ConversionError::ConverterFailed { status: 1 })));
}

#[tokio::test]
async fn test_engine_timeout_is_fatal() {
    let bin = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let engine = fake_engine(bin.path(), "soffice.bin", "exec sleep 30");
    let input = input_file(scratch.path());

    let converter = LibreOfficeConverter::new(
        engine,
        scratch.path().to_path_buf(),
        Duration::from_secs(1),
    );

    let started = std::time::Instant::now();
    let result = convert_with_retry(&converter, &input, "pdf").await;
    assert!(matches!(result, Err(ConversionError::ConverterTimeout { secs: 1 })));
    assert!(started.elapsed() < Duration::from_secs(10));
}
