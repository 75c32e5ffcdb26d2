// src/pipeline/execution.rs

//! `Pipeline::run()`: inline step execution followed by the spawn of detached steps.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::handler::Handler;
use crate::core::step::StepMode;
use crate::error::WorkflowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, instrument, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
{
  /// Runs the pipeline against `ctx_data`.
  ///
  /// Inline steps (`Required`, `Optional`) run in declaration order. The first
  /// handler error aborts the run and is returned as is. Once every inline
  /// step has finished, each `Detached` step whose skip condition does not
  /// hold is spawned on the current tokio runtime. A stopped or failed run
  /// spawns nothing.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let mut detached = Vec::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if step_def.mode == StepMode::Detached {
        detached.push(step_def);
        continue;
      }

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(ctx_data.clone()) {
          event!(Level::DEBUG, step = step_name, "Step skipped by its skip condition.");
          continue;
        }
      }

      if !self.has_handlers(step_name) {
        if step_def.mode == StepMode::Optional {
          event!(Level::DEBUG, step = step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, step = step_name, "Required step has no handlers.");
        return Err(Err::from(WorkflowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = info_span!("pipeline_step", step = step_name, step_index = step_idx);
      let control = run_handlers(self.handlers_in_order(step_name), ctx_data.clone())
        .instrument(step_span)
        .await?;
      if control == PipelineControl::Stop {
        event!(Level::INFO, step = step_name, "Pipeline stopped by a handler.");
        return Ok(PipelineResult::Stopped);
      }
    }

    for step_def in detached {
      self.spawn_detached(step_def.name.as_str(), ctx_data.clone(), step_def.skip_if.as_ref());
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }

  fn spawn_detached(
    &self,
    step_name: &str,
    ctx_data: ContextData<TData>,
    skip_if: Option<&crate::core::step::SkipCondition<TData>>,
  ) {
    if let Some(skip_if) = skip_if {
      if skip_if(ctx_data.clone()) {
        event!(Level::DEBUG, step = step_name, "Detached step skipped by its skip condition.");
        return;
      }
    }
    let handlers = self.handlers_in_order(step_name);
    if handlers.is_empty() {
      event!(Level::DEBUG, step = step_name, "Detached step has no handlers, skipping.");
      return;
    }
    let runtime = match tokio::runtime::Handle::try_current() {
      Ok(handle) => handle,
      Err(e) => {
        event!(Level::ERROR, step = step_name, error = %e, "No tokio runtime available, detached step dropped.");
        return;
      }
    };

    let owned_name = step_name.to_string();
    let span = info_span!("detached_step", step = step_name);
    runtime.spawn(
      async move {
        match run_handlers(handlers, ctx_data).await {
          Ok(_) => event!(Level::DEBUG, step = %owned_name, "Detached step finished."),
          Err(e) => event!(Level::WARN, step = %owned_name, error = %e, "Detached step failed."),
        }
      }
      .instrument(span),
    );
    event!(Level::DEBUG, step = step_name, "Detached step spawned.");
  }
}

/// Runs handlers in order until one stops or fails.
async fn run_handlers<TData, Err>(
  handlers: Vec<Handler<TData, Err>>,
  ctx_data: ContextData<TData>,
) -> Result<PipelineControl, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for (handler_idx, handler_fn) in handlers.iter().enumerate() {
    match handler_fn(ctx_data.clone()).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => return Ok(PipelineControl::Stop),
      Err(e) => {
        event!(Level::ERROR, handler_index = handler_idx, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(PipelineControl::Continue)
}
