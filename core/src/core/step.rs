// src/core/step.rs

use super::ContextData;

/// Evaluated right before a step runs; `true` skips it.
pub type SkipCondition<TData> = std::sync::Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

/// How a step takes part in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
  /// Runs inline. Having no handlers is a configuration error.
  Required,
  /// Runs inline when it has handlers, silently skipped otherwise.
  Optional,
  /// Spawned after all inline steps completed. Never blocks or fails the run.
  Detached,
}

#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  pub mode: StepMode,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("mode", &self.mode)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
