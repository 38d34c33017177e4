//! Semester progression workflow for a university portal.
//!
//! Students report for a semester, enroll in its units once the report is
//! approved, and register resit exams for failed units. See [`Workflow`].

pub mod calendar;
pub mod config;
pub mod db;
pub mod enrollment;
pub mod error;
pub mod grading;
pub mod progression;
pub mod resit;
pub mod server;
pub mod types;
mod workflow;

#[cfg(test)]
mod fixtures;

pub use config::{FailureScope, PassRule, PolicyConfig, WorkflowConfig};
pub use error::{Result, ValidationError, WorkflowError};
pub use workflow::Workflow;
