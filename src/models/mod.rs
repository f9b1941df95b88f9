use crate::error::{ConversionError, Result};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Object key the upstream system writes to probe bucket access. Never converted.
pub const PERMISSIONS_CHECK_KEY: &str = "permissions_check_file";

pub const META_TARGET_FORMAT: &str = "targetformat";
pub const META_CONVERSION_ID: &str = "id";
pub const META_SOURCE_FILE_ID: &str = "sourcefileid";

/// Longest key suffix kept in a scratch file name, leaving room for the uuid prefix.
const MAX_LOCAL_NAME_BYTES: usize = 200;

/// Invocation payload: a batch of S3 event records.
#[derive(Debug, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records")]
    pub records: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: BucketEntity,
    object: ObjectEntity,
}

#[derive(Debug, Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectEntity {
    key: String,
}

/// A single "object created" notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub bucket: String,
    pub key: String,
}

impl Notification {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Extract bucket and key from one raw event record.
    ///
    /// S3 delivers keys form-encoded, so `+` and `%XX` sequences are decoded here.
    pub fn from_record(record: &serde_json::Value) -> Result<Self> {
        let record = EventRecord::deserialize(record)
            .map_err(|e| ConversionError::MalformedRecord(e.to_string()))?;

        let key = decode_object_key(&record.s3.object.key)?;
        Ok(Self::new(record.s3.bucket.name, key))
    }

    pub fn is_permissions_check(&self) -> bool {
        self.key == PERMISSIONS_CHECK_KEY
    }
}

fn decode_object_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|e| ConversionError::MalformedRecord(format!("object key '{}': {}", raw, e)))
}

/// Correlation metadata attached to the source object by the upstream system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub target_format: String,
    pub conversion_id: String,
    pub source_file_id: String,
}

impl ObjectMetadata {
    pub fn from_map(
        bucket: &str,
        key: &str,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<Self> {
        let field = |name: &'static str| {
            metadata
                .and_then(|m| m.get(name))
                .cloned()
                .ok_or_else(|| ConversionError::MissingMetadata {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    field: name,
                })
        };

        Ok(Self {
            target_format: field(META_TARGET_FORMAT)?,
            conversion_id: field(META_CONVERSION_ID)?,
            source_file_id: field(META_SOURCE_FILE_ID)?,
        })
    }

    /// Metadata carried over to the converted object.
    pub fn correlation(&self) -> HashMap<String, String> {
        HashMap::from([
            (META_CONVERSION_ID.to_string(), self.conversion_id.clone()),
            (META_SOURCE_FILE_ID.to_string(), self.source_file_id.clone()),
        ])
    }
}

/// Per-notification pipeline state. Owned by a single processing flow.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub bucket: String,
    pub key: String,
    pub metadata: ObjectMetadata,
    pub download_path: PathBuf,
    pub output_path: PathBuf,
}

impl WorkItem {
    pub fn new(notification: &Notification, metadata: ObjectMetadata, scratch_dir: &Path) -> Self {
        let file_name = format!("{}{}", Uuid::new_v4(), local_file_name(&notification.key));
        let download_path = scratch_dir.join(file_name);
        let output_path = converted_path(&download_path, &metadata.target_format);

        Self {
            bucket: notification.bucket.clone(),
            key: notification.key.clone(),
            metadata,
            download_path,
            output_path,
        }
    }
}

/// Final path segment of `key`, cut to a bounded suffix so the extension survives.
fn local_file_name(key: &str) -> &str {
    let name = key.rsplit('/').next().unwrap_or(key);
    let mut start = name.len().saturating_sub(MAX_LOCAL_NAME_BYTES);
    while !name.is_char_boundary(start) {
        start += 1;
    }
    &name[start..]
}

/// Path the engine writes for `input` when asked for `target_format`.
///
/// Filter suffixes such as `pdf:writer_pdf_Export` only select the export filter.
pub fn converted_path(input: &Path, target_format: &str) -> PathBuf {
    let extension = target_format
        .split_once(':')
        .map_or(target_format, |(ext, _)| ext);
    input.with_extension(extension)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Sentinel object, nothing was done.
    Skipped,
    Converted {
        output_bucket: String,
        output_key: String,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}
