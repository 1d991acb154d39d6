// SPDX-License-Identifier: MIT

//! gradeflow-rs: answer grading with a human-in-the-loop escalation path.
//!
//! - [`adk`] holds the model layer (chat model trait and providers) and errors.
//! - [`gradeflow`] holds the grading workflow: state, nodes, router, engine,
//!   checkpoint stores, capability adapters, configuration and the HTTP API.

pub mod adk;
pub mod gradeflow;
