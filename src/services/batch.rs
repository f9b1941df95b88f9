use crate::error::{ConversionError, Result};
use crate::models::{BatchSummary, Notification, ProcessOutcome, S3Event};
use crate::services::processor::ConversionProcessor;
use serde::Deserialize;
use std::sync::Arc;

/// Runs every record of one invocation through the processor.
///
/// Records are attempted in order and independently. When any of them fails
/// the whole batch is reported failed with the last error seen, so the
/// invoking framework can redrive it.
pub struct BatchDriver {
    processor: Arc<ConversionProcessor>,
}

impl BatchDriver {
    pub fn new(processor: Arc<ConversionProcessor>) -> Self {
        Self { processor }
    }

    pub async fn handle_event(&self, event: &serde_json::Value) -> Result<BatchSummary> {
        let event = match S3Event::deserialize(event) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!("Malformed invocation payload {}: {}", event, e);
                return Err(ConversionError::MalformedEvent(e));
            }
        };

        let mut summary = BatchSummary::default();
        let mut last_error = None;

        for record in &event.records {
            summary.attempted += 1;
            match self.handle_record(record).await {
                Ok(ProcessOutcome::Skipped) => summary.skipped += 1,
                Ok(ProcessOutcome::Converted { .. }) => summary.converted += 1,
                Err(e) => {
                    tracing::error!("Failed to process record {}: {}", record, e);
                    summary.failed += 1;
                    last_error = Some(e);
                }
            }
        }

        tracing::info!(
            "Batch finished: {} attempted, {} converted, {} skipped, {} failed",
            summary.attempted,
            summary.converted,
            summary.skipped,
            summary.failed
        );

        match last_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    async fn handle_record(&self, record: &serde_json::Value) -> Result<ProcessOutcome> {
        let notification = Notification::from_record(record)?;
        self.processor.process(&notification).await
    }
}
