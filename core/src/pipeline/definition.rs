// src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` struct and its structural methods.

use crate::core::handler::Handler;
use crate::core::step::{SkipCondition, StepDef, StepMode};
use crate::error::WorkflowError;
use std::collections::HashMap;

/// An ordered list of named steps over `ContextData<TData>` whose handlers
/// fail with `Err`.
///
/// `Err` must absorb `WorkflowError` so that configuration problems found
/// during a run (a required step without handlers) come back through the
/// same error channel as handler failures.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,

  pub(crate) before_handlers: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on_handlers: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after_handlers: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
{
  pub fn new(step_defs: &[(&str, StepMode, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, mode, skip_if)| StepDef {
        name: (*name).to_string(),
        mode: *mode,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      steps,
      before_handlers: HashMap::new(),
      on_handlers: HashMap::new(),
      after_handlers: HashMap::new(),
    }
  }

  /// Step names in execution order, detached steps included.
  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Panics on an unknown step name: that is a wiring mistake, not a runtime condition.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("Workflow setup error: step '{}' is not part of this pipeline.", step_name);
    }
  }

  pub fn set_mode(&mut self, step_name: &str, mode: StepMode) {
    self.ensure_step_exists(step_name);
    if let Some(step) = self.steps.iter_mut().find(|s| s.name == step_name) {
      step.mode = mode;
    }
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) {
    self.ensure_step_exists(step_name);
    if let Some(step) = self.steps.iter_mut().find(|s| s.name == step_name) {
      step.skip_if = skip_if;
    }
  }

  pub(crate) fn has_handlers(&self, step_name: &str) -> bool {
    [&self.before_handlers, &self.on_handlers, &self.after_handlers]
      .iter()
      .any(|phase| phase.get(step_name).map_or(false, |v| !v.is_empty()))
  }

  /// All handlers of one step in phase order: before, on, after.
  pub(crate) fn handlers_in_order(&self, step_name: &str) -> Vec<Handler<TData, Err>> {
    [&self.before_handlers, &self.on_handlers, &self.after_handlers]
      .iter()
      .filter_map(|phase| phase.get(step_name))
      .flat_map(|handlers| handlers.iter().cloned())
      .collect()
  }
}
