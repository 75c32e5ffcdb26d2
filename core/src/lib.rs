// src/lib.rs

//! A small asynchronous step-pipeline engine.
//!
//! Business processes are written as an ordered list of named steps over a
//! shared, lockable context:
//!  - `before` / `on` / `after` handlers per step.
//!  - Optional steps and `skip_if` conditions.
//!  - Early stop through [`PipelineControl::Stop`].
//!  - Detached steps, spawned fire-and-forget once every inline step has
//!    completed. Their failures are logged, never returned.
//!  - A type-keyed registry ([`Workflows`]) that dispatches a context to the
//!    pipeline registered for its data type.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef, StepMode};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{WorkflowError, WorkflowResult};

pub use crate::registry::Workflows;

/*
    Typical use:
    1. Define a data struct `MyCtx` for the process.
    2. Build a `Pipeline<MyCtx, MyError>` with its step list.
    3. Attach handlers with `.on_step()`, `.before_step()`, `.after_step()`.
       Mark notification-like steps `StepMode::Detached`.
    4. Register the pipeline in a `Workflows<MyError>` registry.
    5. `workflows.run(ContextData::new(my_ctx)).await`, then read results back
       out of the same `ContextData`.
*/
