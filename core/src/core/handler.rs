// src/core/handler.rs

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A step handler: an async function over a clone of the run's `ContextData`.
///
/// Handlers are reference counted so that detached steps can carry them into a
/// spawned task that outlives the borrow of the pipeline.
pub type Handler<TData, Err> = Arc<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;
