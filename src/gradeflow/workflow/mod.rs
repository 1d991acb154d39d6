// SPDX-License-Identifier: MIT

pub mod checkpoint;
pub mod graph;
pub mod nodes;
pub mod state;
