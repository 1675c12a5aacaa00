// Copyright (c) The junit-metrics Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `junit-metrics` failures.
///
/// When a submission command exits with a code, `junit-metrics` exits with that same code instead
/// of one listed here.
pub enum JunitMetricsExitCode {}

impl JunitMetricsExitCode {
    /// All metrics were submitted.
    pub const OK: i32 = 0;

    /// The command line could not be parsed.
    pub const USAGE_ERROR: i32 = 1;

    /// The report file could not be read.
    pub const REPORT_READ_FAILED: i32 = 2;

    /// The report file is not well-formed XML.
    pub const REPORT_PARSE_FAILED: i32 = 3;

    /// A test case in the report carried an invalid `time` attribute, or the suite's total
    /// duration is not a finite number of seconds.
    pub const INVALID_TEST_TIME: i32 = 4;

    /// An error was encountered while loading configuration.
    pub const SETUP_ERROR: i32 = 96;

    /// A submission command could not be started, was terminated by a signal, or a sink
    /// rejected a sample.
    pub const SUBMISSION_FAILED: i32 = 100;

    /// Writing output failed.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
