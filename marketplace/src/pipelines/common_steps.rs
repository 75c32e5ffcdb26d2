// src/pipelines/common_steps.rs

//! Pieces shared by the detached side-effect steps.

use std::future::Future;
use tracing::{debug, warn};
use uuid::Uuid;
use workflow::PipelineControl;

use crate::errors::Result as AppResult;

/// Awaits a post-commit side effect.
///
/// A failure is logged with the order id and the kind of side effect, then
/// returned so the detached step is reported as failed. It never reaches the
/// client and never touches the committed order.
pub async fn best_effort<F>(kind: &'static str, order_id: Uuid, side_effect: F) -> AppResult<PipelineControl>
where
  F: Future<Output = AppResult<()>>,
{
  match side_effect.await {
    Ok(()) => {
      debug!(%order_id, notification_kind = kind, "Side effect delivered.");
      Ok(PipelineControl::Continue)
    }
    Err(e) => {
      warn!(
        %order_id,
        notification_kind = kind,
        error = %e,
        "Side effect failed after commit; manual follow-up may be needed."
      );
      Err(e)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::errors::AppError;

  #[tokio::test]
  async fn failure_is_returned_to_the_engine() {
    let order_id = Uuid::new_v4();
    let ok = best_effort("email", order_id, async { Ok(()) }).await;
    assert!(matches!(ok, Ok(PipelineControl::Continue)));

    let failed = best_effort("email", order_id, async { Err(AppError::Internal("smtp down".into())) }).await;
    assert!(matches!(failed, Err(AppError::Internal(_))));
  }
}
