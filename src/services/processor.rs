use crate::config::WorkerConfig;
use crate::error::Result;
use crate::models::{Notification, ObjectMetadata, ProcessOutcome, WorkItem};
use crate::services::converter::{DocumentConverter, convert_with_retry};
use crate::services::stage::{StageAction, run_parallel};
use crate::services::storage::StorageService;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Drives one notification through fetch, convert and publish.
pub struct ConversionProcessor {
    storage: Arc<dyn StorageService>,
    converter: Arc<dyn DocumentConverter>,
    config: WorkerConfig,
}

impl ConversionProcessor {
    pub fn new(
        storage: Arc<dyn StorageService>,
        converter: Arc<dyn DocumentConverter>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            storage,
            converter,
            config,
        }
    }

    pub async fn process(&self, notification: &Notification) -> Result<ProcessOutcome> {
        if notification.is_permissions_check() {
            tracing::debug!(
                "Ignoring permissions check object in bucket {}",
                notification.bucket
            );
            return Ok(ProcessOutcome::Skipped);
        }

        tracing::info!("Processing object with key {}", notification.key);

        let metadata = self
            .storage
            .head_metadata(&notification.bucket, &notification.key)
            .await?;
        let metadata =
            ObjectMetadata::from_map(&notification.bucket, &notification.key, metadata.as_ref())?;

        let item = WorkItem::new(notification, metadata, &self.config.scratch_dir);

        match self.run_stages(&item).await {
            Ok(()) => {
                tracing::info!(
                    "Converted {}/{} to {}/{} (id: {})",
                    item.bucket,
                    item.key,
                    self.config.output_bucket,
                    item.key,
                    item.metadata.conversion_id
                );
                Ok(ProcessOutcome::Converted {
                    output_bucket: self.config.output_bucket.clone(),
                    output_key: item.key,
                })
            }
            Err(e) => {
                discard_local(&item.download_path).await;
                discard_local(&item.output_path).await;
                Err(e)
            }
        }
    }

    async fn run_stages(&self, item: &WorkItem) -> Result<()> {
        // 1. Fetch the source document
        run_parallel(
            "fetch",
            vec![StageAction::new(
                "download",
                download(
                    self.storage.clone(),
                    item.bucket.clone(),
                    item.key.clone(),
                    item.download_path.clone(),
                ),
            )],
        )
        .await?;

        // 2. Convert, dropping the source object unless asked to keep it
        let mut actions = vec![StageAction::new(
            "convert",
            convert(
                self.converter.clone(),
                item.download_path.clone(),
                item.metadata.target_format.clone(),
            ),
        )];
        if !self.config.keep_files {
            actions.push(StageAction::new(
                "delete-source",
                delete_source(self.storage.clone(), item.bucket.clone(), item.key.clone()),
            ));
        }
        run_parallel("convert", actions).await?;

        // 3. Publish under the original key and drop the local input
        run_parallel(
            "publish",
            vec![
                StageAction::new(
                    "upload",
                    upload(
                        self.storage.clone(),
                        item.output_path.clone(),
                        self.config.output_bucket.clone(),
                        item.key.clone(),
                        item.metadata.correlation(),
                    ),
                ),
                StageAction::new("remove-download", remove_local(item.download_path.clone())),
            ],
        )
        .await?;

        tokio::fs::remove_file(&item.output_path).await?;
        Ok(())
    }
}

async fn download(
    storage: Arc<dyn StorageService>,
    bucket: String,
    key: String,
    path: PathBuf,
) -> Result<()> {
    storage.download_file(&bucket, &key, &path).await?;
    Ok(())
}

async fn convert(
    converter: Arc<dyn DocumentConverter>,
    path: PathBuf,
    target_format: String,
) -> Result<()> {
    convert_with_retry(converter.as_ref(), &path, &target_format).await
}

async fn delete_source(
    storage: Arc<dyn StorageService>,
    bucket: String,
    key: String,
) -> Result<()> {
    storage.delete_file(&bucket, &key).await?;
    tracing::debug!("Deleted source object {}/{}", bucket, key);
    Ok(())
}

async fn upload(
    storage: Arc<dyn StorageService>,
    path: PathBuf,
    bucket: String,
    key: String,
    metadata: HashMap<String, String>,
) -> Result<()> {
    storage.upload_file(&path, &bucket, &key, &metadata).await?;
    Ok(())
}

async fn remove_local(path: PathBuf) -> Result<()> {
    tokio::fs::remove_file(&path).await?;
    Ok(())
}

/// Best-effort removal of scratch files left behind by a failed item.
async fn discard_local(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}
