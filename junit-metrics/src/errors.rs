// Copyright (c) The junit-metrics Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{JunitMetricsExitCode, output::StderrStyles};
use junit_metrics_runner::errors::{
    AggregateError, ConfigParseError, ConfigParseErrorKind, PublishError, ReportLoadError,
    SubmissionError,
};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are short placeholders. Errors are printed out through
// display_to_stderr, which also walks the source chain.

/// A failure `junit-metrics` reports and exits on.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("report load error")]
    ReportLoadError {
        #[from]
        err: ReportLoadError,
    },
    #[error("aggregation error")]
    AggregateError {
        #[from]
        err: AggregateError,
    },
    #[error("submission failed")]
    SubmissionFailed {
        metric_name: String,
        dimensions: String,
        #[source]
        err: SubmissionError,
    },
    #[error("failed to write output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl From<PublishError> for ExpectedError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Write(err) => Self::WriteOutputError { err },
            PublishError::Submission {
                metric_name,
                dimensions,
                err,
            } => Self::SubmissionFailed {
                metric_name,
                dimensions,
                err,
            },
            other => Self::WriteOutputError {
                err: std::io::Error::other(other),
            },
        }
    }
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigParseError { .. } => JunitMetricsExitCode::SETUP_ERROR,
            Self::ReportLoadError { err } => match err {
                ReportLoadError::Parse { .. } => JunitMetricsExitCode::REPORT_PARSE_FAILED,
                _ => JunitMetricsExitCode::REPORT_READ_FAILED,
            },
            Self::AggregateError { .. } => JunitMetricsExitCode::INVALID_TEST_TIME,
            Self::SubmissionFailed { err, .. } => err
                .exit_code()
                .filter(|&code| code != JunitMetricsExitCode::OK)
                .unwrap_or(JunitMetricsExitCode::SUBMISSION_FAILED),
            Self::WriteOutputError { .. } => JunitMetricsExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::ConfigParseError { err } => match err.kind() {
                ConfigParseErrorKind::DeserializeError(deserialize_err) => {
                    error!(
                        "failed to parse config file `{}` at `{}`",
                        err.config_file().style(styles.bold),
                        deserialize_err.path().style(styles.bold),
                    );
                    Some(deserialize_err.inner() as &dyn Error)
                }
                ConfigParseErrorKind::BuildError(build_err) => {
                    error!(
                        "failed to load config file `{}`",
                        err.config_file().style(styles.bold),
                    );
                    Some(&**build_err as &dyn Error)
                }
                _ => {
                    error!(
                        "failed to load config file `{}`",
                        err.config_file().style(styles.bold),
                    );
                    err.source()
                }
            },
            Self::ReportLoadError { err } => match err {
                ReportLoadError::Read { path, err } => {
                    error!("failed to read report `{}`", path.style(styles.bold));
                    Some(err as &dyn Error)
                }
                ReportLoadError::Parse { path, err } => {
                    error!(
                        "report `{}` is not well-formed XML: {err}",
                        path.style(styles.bold),
                    );
                    None
                }
                _ => {
                    error!("{err}");
                    err.source()
                }
            },
            Self::AggregateError { err } => {
                match err {
                    AggregateError::InvalidTestTime(err) => {
                        error!(
                            "test case `{}` has invalid time `{}`, nothing was published",
                            err.test_name().style(styles.bold),
                            err.value().style(styles.bold),
                        );
                    }
                    AggregateError::DurationOverflow { suite_name } => {
                        error!(
                            "total duration of suite `{}` is too large, nothing was published",
                            suite_name.style(styles.bold),
                        );
                    }
                    _ => {
                        error!("{err}, nothing was published");
                    }
                }
                None
            }
            Self::SubmissionFailed {
                metric_name,
                dimensions,
                err,
            } => {
                error!(
                    "failed to submit metric `{}` ({dimensions})",
                    metric_name.style(styles.bold),
                );
                Some(err as &dyn Error)
            }
            Self::WriteOutputError { err } => {
                error!("failed to write output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: "junit_metrics::no_heading", "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
