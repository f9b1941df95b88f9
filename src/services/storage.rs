use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Object storage operations the conversion pipeline depends on.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// User metadata of an object, `None` when the object carries none.
    async fn head_metadata(&self, bucket: &str, key: &str)
    -> Result<Option<HashMap<String, String>>>;
    async fn download_file(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()>;
    async fn upload_file(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()>;
    async fn delete_file(&self, bucket: &str, key: &str) -> Result<()>;
}

pub struct S3StorageService {
    client: Client,
}

impl S3StorageService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn head_metadata(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<HashMap<String, String>>> {
        let res = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("head_object failed for {}/{}", bucket, key))?;

        Ok(res.metadata.filter(|m| !m.is_empty()))
    }

    async fn download_file(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let res = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("get_object failed for {}/{}", bucket, key))?;

        let mut reader = Box::pin(res.body.into_async_read());
        let mut file = tokio::fs::File::create(local_path)
            .await
            .with_context(|| format!("Failed to create {}", local_path.display()))?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;

        tracing::debug!(
            "Downloaded {}/{} to {} ({} bytes)",
            bucket,
            key,
            local_path.display(),
            written
        );
        Ok(())
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()> {
        let body = ByteStream::from_path(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;

        let res = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .set_metadata(Some(metadata.clone()))
            .body(body)
            .send()
            .await;

        if let Err(e) = res {
            tracing::error!(
                "S3 put_object failed: source={}, dest={}/{}, error={:?}",
                local_path.display(),
                bucket,
                key,
                e
            );
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete_file(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }
}
