use crate::config::WorkerConfig;
use crate::services::converter::{DocumentConverter, LibreOfficeConverter};
use std::sync::Arc;
use tracing::info;

pub async fn setup_converter(config: &WorkerConfig) -> Arc<dyn DocumentConverter> {
    let converter = LibreOfficeConverter::new(
        config.soffice_path.clone(),
        config.scratch_dir.clone(),
        config.conversion_timeout(),
    );

    if converter.health_check().await {
        info!("📄 Converter found at {}", config.soffice_path.display());
    } else {
        tracing::warn!(
            "⚠️  Converter not found at {}! Every conversion will fail to launch.",
            config.soffice_path.display()
        );
    }

    Arc::new(converter)
}
