// Copyright (c) The junit-metrics Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line front end for junit-metrics.
//!
//! Reads a JUnit XML report, prints a summary of every test case, and submits
//! per-suite and per-test metrics to CloudWatch through the AWS CLI. The
//! parsing and publishing logic lives in `junit-metrics-runner`.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod exit_codes;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
pub use exit_codes::JunitMetricsExitCode;
pub use output::{OutputContext, OutputWriter, StderrStyles};
