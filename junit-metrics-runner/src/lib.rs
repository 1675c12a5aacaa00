// Copyright (c) The junit-metrics Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for `junit-metrics`.
//!
//! The basic flow is:
//!
//! 1. Read a JUnit XML report into a [`ReportDocument`](report::ReportDocument).
//! 2. [`aggregate`](aggregate::aggregate) it into a [`TestSuite`](aggregate::TestSuite),
//!    classifying every test case and computing suite-level counters.
//! 3. [`publish`](publish::publish) the suite: write human-readable lines and submit one
//!    [`MetricSample`](sink::MetricSample) at a time to a [`MetricsSink`](sink::MetricsSink).

pub mod aggregate;
pub mod config;
pub mod errors;
pub mod publish;
pub mod report;
pub mod sanitize;
pub mod sink;
