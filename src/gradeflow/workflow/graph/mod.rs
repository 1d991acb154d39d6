// SPDX-License-Identifier: MIT

//! Graph-based workflow execution
//!
//! This module provides the executor that walks the grading graph,
//! applies the router at the branch point and persists a checkpoint
//! whenever a node asks to suspend.

pub mod executor;
pub mod router;

pub use executor::{GradingWorkflow, RunResult};
pub use router::{next_node, route, Edge, ENTRY};
