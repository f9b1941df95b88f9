use crate::config::WorkerConfig;
use crate::services::storage::S3StorageService;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::config::Region;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &WorkerConfig) -> Arc<S3StorageService> {
    let region = RegionProviderChain::default_provider()
        .or_else(Region::new(config.aws_region.clone()));

    let mut loader = aws_config::from_env().region(region);
    if let Some(endpoint_url) = &config.s3_endpoint {
        info!("☁️  S3 Storage: custom endpoint {}", endpoint_url);
        loader = loader.endpoint_url(endpoint_url);
    }
    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(config.s3_endpoint.is_some())
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    info!("☁️  S3 Storage ready (output bucket: {})", config.output_bucket);

    Arc::new(S3StorageService::new(s3_client))
}
