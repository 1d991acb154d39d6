// SPDX-License-Identifier: MIT

//! State management for the grading workflow
//!
//! This module provides:
//! - `WorkflowState` - the record every node reads and returns
//! - `SuspendRequest` - what a human reviewer is asked to decide
//! - `ResumeData` - the reviewer's reply, merged back on resume

mod review;
mod workflow_state;

pub use review::{
    ResumeData, ReviewDecision, ReviewTaskData, ReviewTemplate, SuspendRequest,
    FACULTY_EVALUATION, FACULTY_SCORE,
};
pub use workflow_state::WorkflowState;
