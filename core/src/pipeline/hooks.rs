// src/pipeline/hooks.rs

//! Registration of `before`, `on` and `after` handlers.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::Handler;
use crate::error::WorkflowError;
use crate::pipeline::definition::Pipeline;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
{
  /// Adds a handler that runs before the step's `on` handlers.
  ///
  /// The handler may fail with any error convertible into the pipeline's `Err`.
  pub fn before_step<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(Phase::Before, step_name, handler_fn);
  }

  pub fn on_step<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(Phase::On, step_name, handler_fn);
  }

  pub fn after_step<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(Phase::After, step_name, handler_fn);
  }

  fn push_handler<F, HandlerErr>(
    &mut self,
    phase: Phase,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler: Handler<TData, Err> = Arc::new(move |ctx_data| {
      let fut = handler_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    let table: &mut HashMap<String, Vec<Handler<TData, Err>>> = match phase {
      Phase::Before => &mut self.before_handlers,
      Phase::On => &mut self.on_handlers,
      Phase::After => &mut self.after_handlers,
    };
    table.entry(step_name.to_string()).or_default().push(handler);
  }
}
