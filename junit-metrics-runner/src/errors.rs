// Copyright (c) The junit-metrics Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by junit-metrics.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{fmt, io};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse junit-metrics config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of config parse error that occurred.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),
    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// An error that occurred while loading a JUnit report from disk.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportLoadError {
    /// The report could not be read.
    #[error("failed to read report at `{path}`")]
    Read {
        /// The path that was read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// The report was read but is not well-formed XML.
    #[error("failed to parse report at `{path}`")]
    Parse {
        /// The path that was parsed.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: ReportParseError,
    },
}

/// An error that occurred while parsing a JUnit report.
#[derive(Debug, Error)]
#[error("{kind} (at byte {position})")]
#[non_exhaustive]
pub struct ReportParseError {
    kind: ReportParseErrorKind,
    position: usize,
}

impl ReportParseError {
    pub(crate) fn new(kind: ReportParseErrorKind, position: usize) -> Self {
        Self { kind, position }
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ReportParseErrorKind {
        &self.kind
    }

    /// Returns the byte offset in the input at which the error was detected.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// The kind of report parse error that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum ReportParseErrorKind {
    /// The XML tokenizer rejected the input.
    Xml(quick_xml::Error),

    /// The document does not contain a root element.
    NoRootElement,

    /// A second top-level element was found after the root element was closed.
    MultipleRootElements {
        /// The name of the second element.
        name: String,
    },

    /// An end tag was found with no matching open element.
    UnexpectedEndTag {
        /// The name in the end tag.
        name: String,
    },

    /// The input ended while elements were still open.
    UnclosedElement {
        /// The name of the innermost open element.
        name: String,
    },

    /// The input is not valid in the encoding given by its byte order mark or XML declaration.
    Undecodable {
        /// The name of the encoding used to decode the input.
        encoding: &'static str,
    },
}

impl fmt::Display for ReportParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xml(err) => write!(f, "invalid XML: {err}"),
            Self::NoRootElement => write!(f, "document has no root element"),
            Self::MultipleRootElements { name } => {
                write!(f, "unexpected element `{name}` after the root element")
            }
            Self::UnexpectedEndTag { name } => {
                write!(f, "end tag `{name}` does not match any open element")
            }
            Self::UnclosedElement { name } => {
                write!(f, "input ended before element `{name}` was closed")
            }
            Self::Undecodable { encoding } => write!(f, "input is not valid {encoding}"),
        }
    }
}

/// A test case carried a `time` attribute that isn't a non-negative number of seconds.
#[derive(Clone, Debug, Error)]
#[error(
    "test case `{test_name}` has invalid time `{value}` \
     (expected a non-negative number of seconds)"
)]
pub struct InvalidTestTime {
    test_name: String,
    value: String,
}

impl InvalidTestTime {
    pub(crate) fn new(test_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            value: value.into(),
        }
    }

    /// Returns the raw name of the test case.
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Returns the raw `time` value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// An error that occurred while aggregating a report into a suite.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum AggregateError {
    /// A test case has an invalid `time` attribute.
    #[error(transparent)]
    InvalidTestTime(#[from] InvalidTestTime),

    /// The test case times are each valid, but their sum is not a finite number.
    #[error("total duration of suite `{suite_name}` is not a finite number of seconds")]
    DurationOverflow {
        /// The raw suite name.
        suite_name: String,
    },
}

/// An error that occurred while submitting a metric sample.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionError {
    /// The submission command could not be started.
    #[error("failed to execute `{command}`")]
    Exec {
        /// The command line that was executed.
        command: String,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// The submission command exited unsuccessfully.
    #[error("`{command}` exited {}", DisplayExitCode::new(.exit_code.as_ref()))]
    Failed {
        /// The command line that was executed.
        command: String,

        /// The exit code, or `None` if the process was terminated by a signal.
        exit_code: Option<i32>,
    },

    /// A sink rejected the sample without running a command.
    #[error("sink rejected metric `{metric_name}`: {reason}")]
    Rejected {
        /// The metric that was rejected.
        metric_name: String,

        /// Why the sample was rejected.
        reason: String,
    },
}

impl SubmissionError {
    /// Returns the exit code of the submission command, if it ran and exited with one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { exit_code, .. } => *exit_code,
            Self::Exec { .. } | Self::Rejected { .. } => None,
        }
    }
}

struct DisplayExitCode(Option<i32>);

impl DisplayExitCode {
    fn new(exit_code: Option<&i32>) -> Self {
        Self(exit_code.copied())
    }
}

impl fmt::Display for DisplayExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "with code {code}"),
            None => write!(f, "without an exit code (terminated by a signal)"),
        }
    }
}

/// An error that occurred while publishing a test suite.
///
/// Returned by [`publish`](crate::publish::publish). Publishing stops at the first error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PublishError {
    /// Writing a line of output failed.
    #[error("failed to write output")]
    Write(#[source] io::Error),

    /// Submitting a metric sample failed.
    #[error("failed to submit metric `{metric_name}` with dimensions `{dimensions}`")]
    Submission {
        /// The metric being submitted.
        metric_name: String,

        /// The dimension string for the failed sample.
        dimensions: String,

        /// The underlying error.
        #[source]
        err: SubmissionError,
    },
}
