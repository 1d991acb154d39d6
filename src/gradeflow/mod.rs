// SPDX-License-Identifier: MIT

pub mod audit;
pub mod builder;
pub mod config;
pub mod grading;
pub mod review;
pub mod server;
pub mod workflow;
