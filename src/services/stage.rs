use crate::error::{ConversionError, Result};
use futures::future::{BoxFuture, FutureExt, join_all};
use std::future::Future;

/// One unit of work within a pipeline stage.
pub struct StageAction {
    name: String,
    task: BoxFuture<'static, Result<()>>,
}

impl StageAction {
    pub fn new<F>(name: impl Into<String>, task: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            task: task.boxed(),
        }
    }
}

/// Spawn every action, then wait for all of them.
///
/// Siblings are never cancelled: a failing action does not stop the others.
/// Every failure is logged and the first one, in action order, is returned.
pub async fn run_parallel(stage: &str, actions: Vec<StageAction>) -> Result<()> {
    tracing::debug!("Stage '{}': starting {} action(s)", stage, actions.len());

    let (names, handles): (Vec<_>, Vec<_>) = actions
        .into_iter()
        .map(|action| (action.name, tokio::spawn(action.task)))
        .unzip();

    let results = join_all(handles).await;

    let mut first_error = None;
    for (name, joined) in names.into_iter().zip(results) {
        let result = joined.unwrap_or_else(|e| {
            Err(ConversionError::TaskFailed {
                action: name.clone(),
                reason: e.to_string(),
            })
        });

        if let Err(e) = result {
            tracing::error!("Stage '{}': action '{}' failed: {}", stage, name, e);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            tracing::debug!("Stage '{}' completed", stage);
            Ok(())
        }
    }
}
