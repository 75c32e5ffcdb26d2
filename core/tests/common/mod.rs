// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;
use tracing::Level;
use workflow::{ContextData, PipelineControl, WorkflowError};

#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Workflow error: {0}")]
  Workflow(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<WorkflowError> for TestError {
  fn from(err: WorkflowError) -> Self {
    TestError::Workflow(format!("{:?}", err))
  }
}

pub type BoxedStepFuture = std::pin::Pin<Box<dyn std::future::Future<Output = Result<PipelineControl, TestError>> + Send>>;

/// Appends `message` and records the step; stops if the context asks to stop here.
pub fn recording_handler(
  step_name: &'static str,
  message: &'static str,
) -> impl Fn(ContextData<TestContext>) -> BoxedStepFuture + Send + Sync + 'static {
  move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message);
      guard.steps_executed.push(step_name.to_string());
      tracing::debug!(target: "test_handlers", step = step_name, counter = guard.counter, "executed");
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  }
}

pub fn failing_handler(
  step_name: &'static str,
  error_message: &'static str,
) -> impl Fn(ContextData<TestContext>) -> BoxedStepFuture + Send + Sync + 'static {
  move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err(TestError::Handler(error_message.to_string()))
    })
  }
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub static DETACHED_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  DETACHED_EXEC_COUNTER.store(0, Ordering::SeqCst);
}

/// Polls `condition` until it holds or one second has passed.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
  for _ in 0..100 {
    if condition() {
      return true;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  condition()
}
