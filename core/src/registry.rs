// src/registry.rs

//! `Workflows<AppErr>`: pipelines keyed by the type of data they run over.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::WorkflowError;
use crate::pipeline::definition::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

/// Object-safe view of a registered pipeline.
#[async_trait]
trait ErasedPipeline<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  /// `ctx` must be a boxed `ContextData<TData>` for the pipeline's `TData`.
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr>;
}

#[async_trait]
impl<TData, HandlerErr, AppErr> ErasedPipeline<AppErr> for Pipeline<TData, HandlerErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HandlerErr> + From<WorkflowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr> {
    let ctx_data = match ctx.downcast::<ContextData<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<TData>>().to_string();
        event!(Level::ERROR, %expected_type, "Registry handed a context of the wrong type.");
        return Err(AppErr::from(WorkflowError::ContextMismatch { expected_type }));
      }
    };
    self.run(ctx_data).await.map_err(AppErr::from)
  }
}

/// Registry of pipelines, one per context data type.
///
/// Registration happens once at startup; lookups take a short read lock and
/// release it before the pipeline runs.
pub struct Workflows<AppErr = WorkflowError>
where
  AppErr: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
{
  pipelines: RwLock<HashMap<TypeId, Arc<dyn ErasedPipeline<AppErr>>>>,
}

impl<AppErr> Workflows<AppErr>
where
  AppErr: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      pipelines: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `pipeline` for `TData`, replacing any earlier registration.
  pub fn register<TData, HandlerErr>(&self, pipeline: Pipeline<TData, HandlerErr>)
  where
    TData: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
    AppErr: From<HandlerErr>,
  {
    event!(
      Level::DEBUG,
      context_type = %std::any::type_name::<TData>(),
      steps = ?pipeline.step_names(),
      "Registering pipeline."
    );
    let erased: Arc<dyn ErasedPipeline<AppErr>> = Arc::new(pipeline);
    self.pipelines.write().insert(TypeId::of::<TData>(), erased);
  }

  pub fn is_registered<TData: 'static>(&self) -> bool {
    self.pipelines.read().contains_key(&TypeId::of::<TData>())
  }

  /// Runs the pipeline registered for `TData`.
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, AppErr>
  where
    TData: 'static + Send + Sync,
  {
    let pipeline = self.pipelines.read().get(&TypeId::of::<TData>()).cloned();
    let pipeline = pipeline.ok_or_else(|| {
      let type_name = std::any::type_name::<TData>().to_string();
      event!(Level::ERROR, %type_name, "No pipeline registered for context type.");
      AppErr::from(WorkflowError::NotRegistered { type_name })
    })?;
    pipeline.run_erased(Box::new(ctx_data)).await
  }
}

impl<AppErr> Default for Workflows<AppErr>
where
  AppErr: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
