// SPDX-License-Identifier: MIT

//! Agent development kit: chat models and the shared error types.

pub mod error;
pub mod model;
