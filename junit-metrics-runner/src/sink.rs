// Copyright (c) The junit-metrics Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric samples and the sinks they are submitted to.
//!
//! The [`MetricsSink`] trait is the seam between aggregation and the outside world.
//! [`CloudWatchSink`] submits each sample by running `aws cloudwatch put-metric-data`;
//! [`DryRunSink`] only logs what would be run, and [`RecordingSink`] keeps samples in memory.

use crate::{config::PublishConfig, errors::SubmissionError};
use indexmap::IndexMap;
use std::{borrow::Cow, fmt};
use tracing::{debug, info};

/// The name of a published metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricName {
    /// Number of test cases (suite level only).
    Total,
    /// Passed test cases.
    Passed,
    /// Failed or errored test cases.
    Failed,
    /// Skipped test cases.
    Skipped,
    /// Time taken, in seconds.
    Duration,
}

impl MetricName {
    /// Returns the metric name as sent to the metrics service.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Total => "Total",
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::Skipped => "Skipped",
            Self::Duration => "Duration",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of a metric sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricUnit {
    /// A plain count.
    Count,
    /// A duration in seconds.
    Seconds,
}

impl MetricUnit {
    /// Returns the unit as spelled by CloudWatch.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "Count",
            Self::Seconds => "Seconds",
        }
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered set of dimensions attached to a sample.
///
/// Displays as `Key1=Value1,Key2=Value2` in insertion order, which is the form
/// `put-metric-data --dimensions` accepts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DimensionSet {
    dimensions: IndexMap<&'static str, String>,
}

impl DimensionSet {
    /// Creates an empty dimension set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dimension. Re-inserting a key replaces its value but keeps its position.
    pub fn insert(&mut self, key: &'static str, value: impl Into<String>) -> &mut Self {
        self.dimensions.insert(key, value.into());
        self
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.dimensions.get(key).map(String::as_str)
    }

    /// Iterates over the dimensions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.dimensions
            .iter()
            .map(|(key, value)| (*key, value.as_str()))
    }

    /// Returns the number of dimensions.
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    /// Returns true if there are no dimensions.
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

impl fmt::Display for DimensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// A single value to submit to the metrics service.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSample {
    /// The metric name.
    pub metric_name: MetricName,

    /// The value. Counts and 0/1 indicators are whole numbers.
    pub value: f64,

    /// The unit of `value`.
    pub unit: MetricUnit,

    /// The dimensions, in order.
    pub dimensions: DimensionSet,
}

impl MetricSample {
    /// Creates a new sample.
    pub fn new(
        metric_name: MetricName,
        value: f64,
        unit: MetricUnit,
        dimensions: DimensionSet,
    ) -> Self {
        Self {
            metric_name,
            value,
            unit,
            dimensions,
        }
    }
}

/// Somewhere metric samples can be submitted.
pub trait MetricsSink {
    /// Submits a single sample. Returning an error stops publishing.
    fn submit(&mut self, sample: &MetricSample) -> Result<(), SubmissionError>;
}

impl<T: MetricsSink + ?Sized> MetricsSink for &mut T {
    fn submit(&mut self, sample: &MetricSample) -> Result<(), SubmissionError> {
        (**self).submit(sample)
    }
}

impl<T: MetricsSink + ?Sized> MetricsSink for Box<T> {
    fn submit(&mut self, sample: &MetricSample) -> Result<(), SubmissionError> {
        (**self).submit(sample)
    }
}

/// A `put-metric-data` call for one sample.
#[derive(Clone, Debug)]
pub struct PutMetricDataCli<'a> {
    program: &'a str,
    args: Vec<Cow<'a, str>>,
}

impl<'a> PutMetricDataCli<'a> {
    /// Creates the command line for `sample`:
    /// `<command> cloudwatch put-metric-data --region .. --namespace .. --metric-name ..
    /// --value .. --unit .. --dimensions ..`.
    pub fn new(config: &'a PublishConfig, sample: &MetricSample) -> Self {
        let mut cli = Self {
            program: config.command(),
            args: Vec::with_capacity(14),
        };
        cli.add_arg("cloudwatch")
            .add_arg("put-metric-data")
            .add_arg("--region")
            .add_arg(config.region())
            .add_arg("--namespace")
            .add_arg(config.namespace())
            .add_arg("--metric-name")
            .add_arg(sample.metric_name.as_str())
            .add_arg("--value")
            .add_arg(sample.value.to_string())
            .add_arg("--unit")
            .add_arg(sample.unit.as_str())
            .add_arg("--dimensions")
            .add_arg(sample.dimensions.to_string());
        cli
    }

    fn add_arg(&mut self, arg: impl Into<Cow<'a, str>>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    /// Returns the program that will be run.
    pub fn program(&self) -> &str {
        self.program
    }

    /// Returns the arguments passed to the program.
    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(|arg| &**arg)
    }

    /// Converts the command to a [`duct::Expression`].
    pub fn to_expression(&self) -> duct::Expression {
        duct::cmd(self.program, self.args())
    }

    /// Runs the command to completion with inherited standard streams.
    pub fn run(&self) -> Result<(), SubmissionError> {
        let expression = self.to_expression();
        debug!("executing command: {}", self);
        let output = expression
            .unchecked()
            .run()
            .map_err(|err| SubmissionError::Exec {
                command: self.to_string(),
                err,
            })?;
        if output.status.success() {
            Ok(())
        } else {
            Err(SubmissionError::Failed {
                command: self.to_string(),
                exit_code: output.status.code(),
            })
        }
    }
}

impl fmt::Display for PutMetricDataCli<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Submits samples to CloudWatch by running the AWS CLI once per sample.
///
/// There is no timeout: a hung command hangs the run.
#[derive(Clone, Debug)]
pub struct CloudWatchSink {
    config: PublishConfig,
}

impl CloudWatchSink {
    /// Creates a new sink with the given region, namespace and command.
    pub fn new(config: PublishConfig) -> Self {
        Self { config }
    }
}

impl MetricsSink for CloudWatchSink {
    fn submit(&mut self, sample: &MetricSample) -> Result<(), SubmissionError> {
        PutMetricDataCli::new(&self.config, sample).run()
    }
}

/// Logs the command each sample would run, without running anything.
#[derive(Clone, Debug)]
pub struct DryRunSink {
    config: PublishConfig,
}

impl DryRunSink {
    /// Creates a new dry-run sink.
    pub fn new(config: PublishConfig) -> Self {
        Self { config }
    }
}

impl MetricsSink for DryRunSink {
    fn submit(&mut self, sample: &MetricSample) -> Result<(), SubmissionError> {
        info!("would run: {}", PutMetricDataCli::new(&self.config, sample));
        Ok(())
    }
}

/// Keeps submitted samples in memory.
///
/// Optionally rejects the submission at a given index, which is useful for testing how publishing
/// handles failures.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    samples: Vec<MetricSample>,
    fail_at: Option<usize>,
    calls: usize,
}

impl RecordingSink {
    /// Creates a sink that accepts every sample.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that rejects the submission with the given zero-based index.
    ///
    /// Samples before that index are recorded.
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    /// Returns the samples accepted so far, in submission order.
    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Returns the number of times `submit` was called.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Consumes the sink, returning the accepted samples.
    pub fn into_samples(self) -> Vec<MetricSample> {
        self.samples
    }
}

impl MetricsSink for RecordingSink {
    fn submit(&mut self, sample: &MetricSample) -> Result<(), SubmissionError> {
        let index = self.calls;
        self.calls += 1;
        if self.fail_at == Some(index) {
            return Err(SubmissionError::Rejected {
                metric_name: sample.metric_name.to_string(),
                reason: format!("configured to fail at submission {index}"),
            });
        }
        self.samples.push(sample.clone());
        Ok(())
    }
}
