// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use serial_test::serial;
use std::sync::Arc;
use workflow::{ContextData, Pipeline, PipelineControl, PipelineResult, StepMode, WorkflowError};

#[tokio::test]
#[serial]
async fn test_pipeline_runs_steps_in_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("step1", StepMode::Required, None),
    ("step2", StepMode::Required, None),
    ("step3", StepMode::Required, None),
  ]);

  pipeline.on_step("step1", recording_handler("step1", " S1"));
  pipeline.on_step("step2", recording_handler("step2", " S2"));
  pipeline.on_step("step3", recording_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_before_on_after_run_in_phase_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("only", StepMode::Required, None)]);

  // Registered out of order on purpose.
  pipeline.after_step("only", recording_handler("after", "A"));
  pipeline.on_step("only", recording_handler("on", "O"));
  pipeline.before_step("only", recording_handler("before", "B"));

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().message, "BOA");
}

#[tokio::test]
#[serial]
async fn test_pipeline_stops_on_pipeline_control_stop() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("stepA", StepMode::Required, None),
    ("stopStep", StepMode::Required, None),
    ("stepC", StepMode::Required, None),
  ]);

  pipeline.on_step("stepA", recording_handler("stepA", "A"));
  pipeline.on_step("stopStep", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push("stopStep".to_string());
      Ok::<PipelineControl, WorkflowError>(PipelineControl::Stop)
    })
  });
  pipeline.on_step("stepC", recording_handler("stepC", "C"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  let guard = ctx.read();
  assert_eq!(guard.counter, 1);
  assert_eq!(guard.steps_executed, vec!["stepA", "stopStep"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_propagates_handler_error() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("good_step", StepMode::Required, None),
    ("bad_step", StepMode::Required, None),
    ("another_step", StepMode::Required, None),
  ]);

  pipeline.on_step("good_step", recording_handler("good_step", "Good"));
  pipeline.on_step("bad_step", failing_handler("bad_step", "I am a bad step!"));
  pipeline.on_step("another_step", recording_handler("another_step", "NeverRun"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("I am a bad step!".to_string()));
  let guard = ctx.read();
  assert_eq!(guard.message, "Good");
  assert_eq!(guard.steps_executed, vec!["good_step", "bad_step"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_skips_step_if_condition_met() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("step1", StepMode::Required, None),
    (
      "step_to_skip",
      StepMode::Required,
      Some(Arc::new(|ctx: ContextData<TestContext>| ctx.read().counter > 0)),
    ),
    ("step3", StepMode::Required, None),
  ]);

  pipeline.on_step("step1", recording_handler("step1", " S1"));
  pipeline.on_step("step_to_skip", recording_handler("step_to_skip", " SKIPPED"));
  pipeline.on_step("step3", recording_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().steps_executed, vec!["step1", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_required_step_missing_handler_fails() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("step_with_no_handler", StepMode::Required, None)]);

  let result = pipeline.run(ContextData::new(TestContext::default())).await;

  match result {
    Err(TestError::Workflow(s)) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("step_with_no_handler"));
    }
    other => panic!("Expected WorkflowError::HandlerMissing, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_optional_step_missing_handler_succeeds() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("optional_step_no_handler", StepMode::Optional, None),
    ("last", StepMode::Required, None),
  ]);
  pipeline.on_step("last", recording_handler("last", "L"));

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().steps_executed, vec!["last"]);
}

#[tokio::test]
#[serial]
async fn test_set_mode_makes_step_optional() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("maybe", StepMode::Required, None)]);
  pipeline.set_mode("maybe", StepMode::Optional);

  let result = pipeline.run(ContextData::new(TestContext::default())).await;
  assert_eq!(result.unwrap(), PipelineResult::Completed);
}

#[test]
#[should_panic(expected = "not part of this pipeline")]
fn test_registering_handler_for_unknown_step_panics() {
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("known", StepMode::Required, None)]);
  pipeline.on_step("unknown", recording_handler("unknown", "U"));
}

#[tokio::test]
#[serial]
async fn test_context_is_shared_between_steps() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, WorkflowError>::new(&[
    ("write", StepMode::Required, None),
    ("read_then_write", StepMode::Required, None),
  ]);

  pipeline.on_step("write", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().counter = 10;
      Ok::<_, WorkflowError>(PipelineControl::Continue)
    })
  });
  pipeline.on_step("read_then_write", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let seen = ctx.read().counter;
      tokio::time::sleep(std::time::Duration::from_millis(1)).await;
      ctx.write().counter = seen + 5;
      Ok::<_, WorkflowError>(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.snapshot().counter, 15);
  assert_eq!(*ctx.map_read(|d| &d.counter), 15);
}
