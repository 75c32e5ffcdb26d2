// src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for required step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No pipeline registered for context type {type_name}")]
  NotRegistered { type_name: String },

  #[error("Context type mismatch: expected {expected_type}")]
  ContextMismatch { expected_type: String },

  #[error("Error in handler or external operation. Source: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal workflow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for WorkflowError {
  fn from(err: AnyhowError) -> Self {
    WorkflowError::Handler { source: err }
  }
}

pub type WorkflowResult<T, E = WorkflowError> = std::result::Result<T, E>;
