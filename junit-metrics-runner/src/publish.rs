// Copyright (c) The junit-metrics Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publishing an aggregated suite.
//!
//! Publishing interleaves human-readable lines with submissions: the suite summary line, then the
//! five suite samples, then for each test case its line followed by its four samples. The first
//! write or submission error stops publishing, so nothing past a failed submission is written or
//! submitted.
//!
//! Lines have a stable format for log scrapers:
//!
//! ```text
//! nightly_run - total: 3, passed: 1, failed: 1, skipped: 1 - 4.50s
//! nightly_run/login_works - PASSED - 1.25s
//! ```

use crate::{
    aggregate::{SUITE_SAMPLE_COUNT, TEST_CASE_SAMPLE_COUNT, TestCase, TestOutcome, TestSuite},
    errors::PublishError,
    sink::{MetricSample, MetricsSink},
};
use owo_colors::{OwoColorize, Style, style};
use std::io::Write;
use tracing::{debug, info};

/// Writes lines for `suite` to `writer` and submits `samples` to `sink`.
///
/// `samples` are the samples [`aggregate`](crate::aggregate::aggregate) returned alongside
/// `suite`: the suite samples first, then each test case's samples in report order.
pub fn publish(
    suite: &TestSuite,
    samples: &[MetricSample],
    sink: &mut dyn MetricsSink,
    writer: &mut dyn Write,
    styles: &PublishStyles,
) -> Result<PublishSummary, PublishError> {
    let mut publisher = Publisher {
        sink,
        writer,
        styles,
        samples_submitted: 0,
    };

    info!(
        "publishing metrics for suite `{}` ({} test cases)",
        suite.sanitized_name(),
        suite.total(),
    );

    debug_assert_eq!(
        samples.len(),
        SUITE_SAMPLE_COUNT + TEST_CASE_SAMPLE_COUNT * suite.total(),
        "samples must be the ones aggregated for this suite",
    );
    let (suite_samples, test_case_samples) =
        samples.split_at(SUITE_SAMPLE_COUNT.min(samples.len()));

    publisher.write_suite_line(suite)?;
    for sample in suite_samples {
        publisher.submit(sample)?;
    }

    for (test_case, samples) in suite
        .test_cases()
        .iter()
        .zip(test_case_samples.chunks(TEST_CASE_SAMPLE_COUNT))
    {
        publisher.write_test_line(suite, test_case)?;
        for sample in samples {
            publisher.submit(sample)?;
        }
    }

    let summary = PublishSummary {
        test_cases: suite.total(),
        samples_submitted: publisher.samples_submitted,
    };
    info!("submitted {} samples", summary.samples_submitted);
    Ok(summary)
}

/// Statistics about a completed [`publish`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublishSummary {
    /// The number of test cases published.
    pub test_cases: usize,

    /// The number of samples submitted.
    pub samples_submitted: usize,
}

/// Styles for output lines.
///
/// The default has no styling, which keeps the output plain text.
#[derive(Clone, Debug, Default)]
pub struct PublishStyles {
    suite_name: Style,
    passed: Style,
    failed: Style,
    skipped: Style,
}

impl PublishStyles {
    /// Enables ANSI colors.
    pub fn colorize(&mut self) {
        self.suite_name = style().bold();
        self.passed = style().green().bold();
        self.failed = style().red().bold();
        self.skipped = style().yellow().bold();
    }

    fn outcome(&self, outcome: TestOutcome) -> Style {
        match outcome {
            TestOutcome::Passed => self.passed,
            TestOutcome::Failed => self.failed,
            TestOutcome::Skipped => self.skipped,
        }
    }
}

struct Publisher<'s, 'w> {
    sink: &'s mut dyn MetricsSink,
    writer: &'w mut dyn Write,
    styles: &'w PublishStyles,
    samples_submitted: usize,
}

impl Publisher<'_, '_> {
    fn write_suite_line(&mut self, suite: &TestSuite) -> Result<(), PublishError> {
        writeln!(
            self.writer,
            "{} - total: {}, passed: {}, failed: {}, skipped: {} - {:.2}s",
            suite.sanitized_name().style(self.styles.suite_name),
            suite.total(),
            suite.passed(),
            suite.failed(),
            suite.skipped(),
            suite.total_duration(),
        )
        .and_then(|()| self.writer.flush())
        .map_err(PublishError::Write)
    }

    fn write_test_line(
        &mut self,
        suite: &TestSuite,
        test_case: &TestCase,
    ) -> Result<(), PublishError> {
        writeln!(
            self.writer,
            "{}/{} - {} - {:.2}s",
            suite.sanitized_name(),
            test_case.sanitized_name,
            test_case
                .outcome
                .label()
                .style(self.styles.outcome(test_case.outcome)),
            test_case.time,
        )
        .and_then(|()| self.writer.flush())
        .map_err(PublishError::Write)
    }

    fn submit(&mut self, sample: &MetricSample) -> Result<(), PublishError> {
        debug!(
            "submitting {}={} {} ({})",
            sample.metric_name, sample.value, sample.unit, sample.dimensions,
        );
        self.sink
            .submit(sample)
            .map_err(|err| PublishError::Submission {
                metric_name: sample.metric_name.to_string(),
                dimensions: sample.dimensions.to_string(),
                err,
            })?;
        self.samples_submitted += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::SubmissionError, sink::RecordingSink};
    use pretty_assertions::assert_eq;

    fn sample_suite() -> TestSuite {
        let mut suite = TestSuite::new("nightly run");
        suite
            .add_test_case(TestCase::new("login works", 1.25, TestOutcome::Passed))
            .add_test_case(TestCase::new("Löschen (slow)", 3.0, TestOutcome::Failed))
            .add_test_case(TestCase::new("skipped one", 0.0, TestOutcome::Skipped));
        suite
    }

    #[test]
    fn publish_writes_lines_and_submits_in_order() {
        let suite = sample_suite();
        let mut sink = RecordingSink::new();
        let mut output = Vec::new();

        let samples = suite.metric_samples();
        let summary = publish(
            &suite,
            &samples,
            &mut sink,
            &mut output,
            &PublishStyles::default(),
        )
        .expect("publishing succeeds");

        assert_eq!(
            summary,
            PublishSummary {
                test_cases: 3,
                samples_submitted: 17,
            }
        );
        assert_eq!(sink.samples(), samples.as_slice());
        assert_eq!(
            String::from_utf8(output).expect("output is UTF-8"),
            "nightly_run - total: 3, passed: 1, failed: 1, skipped: 1 - 4.25s\n\
             nightly_run/login_works - PASSED - 1.25s\n\
             nightly_run/Loschen__slow_ - FAILED - 3.00s\n\
             nightly_run/skipped_one - SKIPPED - 0.00s\n"
        );
    }

    #[test]
    fn submission_failure_stops_publishing() {
        let suite = sample_suite();
        // Suite samples are 0..5, the first test case's are 5..9; fail on its Duration.
        let mut sink = RecordingSink::failing_at(8);
        let mut output = Vec::new();

        let err = publish(
            &suite,
            &suite.metric_samples(),
            &mut sink,
            &mut output,
            &PublishStyles::default(),
        )
        .expect_err("publishing fails");

        match err {
            PublishError::Submission {
                metric_name,
                dimensions,
                err,
            } => {
                assert_eq!(metric_name, "Duration");
                assert_eq!(dimensions, "SuiteName=nightly_run,TestName=login_works");
                assert!(matches!(err, SubmissionError::Rejected { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sink.calls(), 9);
        assert_eq!(sink.samples().len(), 8);

        let output = String::from_utf8(output).expect("output is UTF-8");
        assert_eq!(output.lines().count(), 2, "no lines after the failure: {output}");
    }

    #[test]
    fn colorized_output_keeps_text() {
        let suite = sample_suite();
        let mut styles = PublishStyles::default();
        styles.colorize();
        let mut output = Vec::new();

        publish(
            &suite,
            &suite.metric_samples(),
            &mut RecordingSink::new(),
            &mut output,
            &styles,
        )
        .expect("publishing succeeds");

        let output = String::from_utf8(output).expect("output is UTF-8");
        assert!(output.contains("\u{1b}["), "output is colorized: {output:?}");
        assert!(output.contains("PASSED"));
    }
}
