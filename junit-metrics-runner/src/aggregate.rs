// Copyright (c) The junit-metrics Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of test cases and suite-level aggregation.

use crate::{
    errors::{AggregateError, InvalidTestTime},
    report::{RawTestcase, ReportDocument, StatusMarkers},
    sanitize::sanitize,
    sink::{DimensionSet, MetricName, MetricSample, MetricUnit},
};
use camino::Utf8Path;
use std::fmt;

/// The name used for a suite or test case that has no usable name.
pub const UNKNOWN_NAME: &str = "unknown";

/// The dimension key carrying the sanitized suite name.
pub const SUITE_NAME_DIMENSION: &str = "SuiteName";

/// The dimension key carrying the sanitized test case name.
pub const TEST_NAME_DIMENSION: &str = "TestName";

/// The number of suite-level samples: `Total`, `Passed`, `Failed`, `Skipped` and `Duration`.
pub const SUITE_SAMPLE_COUNT: usize = 5;

/// The number of samples per test case: `Passed`, `Failed`, `Skipped` and `Duration`.
pub const TEST_CASE_SAMPLE_COUNT: usize = 4;

/// Aggregates a parsed report into a [`TestSuite`] and the metric samples to publish for it.
///
/// `report_path` is used to name the suite if the root element has no `name` (or an empty one).
///
/// Returns an error if any test case has a `time` attribute that isn't a non-negative number, or
/// if the times add up to more than an `f64` can hold. In that case nothing should be published
/// for the report.
pub fn aggregate(
    document: &ReportDocument,
    report_path: &Utf8Path,
) -> Result<(TestSuite, Vec<MetricSample>), AggregateError> {
    let name = resolve_suite_name(document.root_name.as_deref(), report_path);
    let mut suite = TestSuite::new(name);
    for raw in &document.testcases {
        suite.add_test_case(TestCase::from_raw(raw)?);
    }
    if !suite.total_duration().is_finite() {
        return Err(AggregateError::DurationOverflow {
            suite_name: suite.name().to_owned(),
        });
    }
    let samples = suite.metric_samples();
    Ok((suite, samples))
}

/// Returns the suite name for a report, before sanitization.
///
/// This is the root element's `name` if it is present and non-empty, and otherwise the report
/// file's name without its extension.
pub fn resolve_suite_name(root_name: Option<&str>, report_path: &Utf8Path) -> String {
    match root_name {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => report_path.file_stem().unwrap_or(UNKNOWN_NAME).to_owned(),
    }
}

/// Parses a test case's `time` attribute into seconds.
///
/// A missing attribute means zero seconds. A present value must be a finite, non-negative number;
/// anything else is an error rather than being coerced.
pub fn parse_test_time(test_name: &str, time: Option<&str>) -> Result<f64, InvalidTestTime> {
    let Some(value) = time else {
        return Ok(0.0);
    };
    match value.trim().parse::<f64>() {
        // Normalize -0.0 so it prints as 0.
        Ok(seconds) if seconds == 0.0 => Ok(0.0),
        Ok(seconds) if seconds.is_finite() && seconds > 0.0 => Ok(seconds),
        _ => Err(InvalidTestTime::new(test_name, value)),
    }
}

/// The outcome of a single test case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TestOutcome {
    /// The test passed.
    Passed,

    /// The test failed or errored.
    Failed,

    /// The test was skipped.
    Skipped,
}

impl TestOutcome {
    /// Classifies a test case by its status markers.
    ///
    /// `skipped` takes priority over `failure` and `error`, so a test carrying both is reported
    /// as skipped.
    pub fn classify(markers: StatusMarkers) -> Self {
        if markers.skipped {
            Self::Skipped
        } else if markers.failure || markers.error {
            Self::Failed
        } else {
            Self::Passed
        }
    }

    /// The label used for this outcome in output lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }

    fn indicator(self, outcome: TestOutcome) -> f64 {
        if self == outcome { 1.0 } else { 0.0 }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified test case.
#[derive(Clone, Debug, PartialEq)]
pub struct TestCase {
    /// The name as written in the report.
    pub name: String,

    /// The sanitized name, used as the `TestName` dimension.
    pub sanitized_name: String,

    /// The time taken, in seconds.
    pub time: f64,

    /// The outcome.
    pub outcome: TestOutcome,
}

impl TestCase {
    /// Creates a new test case.
    pub fn new(name: impl Into<String>, time: f64, outcome: TestOutcome) -> Self {
        let name = name.into();
        let sanitized_name = sanitize(&name);
        Self {
            name,
            sanitized_name,
            time,
            outcome,
        }
    }

    /// Classifies a test case as read from the report.
    pub fn from_raw(raw: &RawTestcase) -> Result<Self, InvalidTestTime> {
        let name = raw.name.as_deref().unwrap_or(UNKNOWN_NAME);
        let time = parse_test_time(name, raw.time.as_deref())?;
        Ok(Self::new(name, time, TestOutcome::classify(raw.markers)))
    }

    /// Returns the samples for this test case: `Passed`, `Failed` and `Skipped` as 0/1
    /// indicators, then `Duration`. Each is dimensioned by suite and test name.
    pub fn metric_samples(
        &self,
        sanitized_suite_name: &str,
    ) -> [MetricSample; TEST_CASE_SAMPLE_COUNT] {
        let mut dimensions = DimensionSet::new();
        dimensions
            .insert(SUITE_NAME_DIMENSION, sanitized_suite_name)
            .insert(TEST_NAME_DIMENSION, &self.sanitized_name);

        let indicator = |metric_name, outcome| {
            MetricSample::new(
                metric_name,
                self.outcome.indicator(outcome),
                MetricUnit::Count,
                dimensions.clone(),
            )
        };
        [
            indicator(MetricName::Passed, TestOutcome::Passed),
            indicator(MetricName::Failed, TestOutcome::Failed),
            indicator(MetricName::Skipped, TestOutcome::Skipped),
            MetricSample::new(
                MetricName::Duration,
                self.time,
                MetricUnit::Seconds,
                dimensions.clone(),
            ),
        ]
    }
}

/// A suite of classified test cases, with counters.
///
/// The counters are only updated through [`add_test_case`](Self::add_test_case), so `total`
/// always equals `passed + failed + skipped`.
#[derive(Clone, Debug, PartialEq)]
pub struct TestSuite {
    name: String,
    sanitized_name: String,
    test_cases: Vec<TestCase>,
    passed: usize,
    failed: usize,
    skipped: usize,
    total_duration: f64,
}

impl TestSuite {
    /// Creates a new, empty suite.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let sanitized_name = sanitize(&name);
        Self {
            name,
            sanitized_name,
            test_cases: Vec::new(),
            passed: 0,
            failed: 0,
            skipped: 0,
            total_duration: 0.0,
        }
    }

    /// Adds a test case and updates the counters.
    pub fn add_test_case(&mut self, test_case: TestCase) -> &mut Self {
        match test_case.outcome {
            TestOutcome::Passed => self.passed += 1,
            TestOutcome::Failed => self.failed += 1,
            TestOutcome::Skipped => self.skipped += 1,
        }
        self.total_duration += test_case.time;
        self.test_cases.push(test_case);
        self
    }

    /// The suite name before sanitization.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sanitized suite name, used as the `SuiteName` dimension.
    pub fn sanitized_name(&self) -> &str {
        &self.sanitized_name
    }

    /// The test cases in report order.
    pub fn test_cases(&self) -> &[TestCase] {
        &self.test_cases
    }

    /// The number of test cases.
    pub fn total(&self) -> usize {
        self.test_cases.len()
    }

    /// The number of passed test cases.
    pub fn passed(&self) -> usize {
        self.passed
    }

    /// The number of failed (or errored) test cases.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// The number of skipped test cases.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The sum of all test case times, in seconds, added in report order.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Returns the suite-level samples: `Total`, `Passed`, `Failed`, `Skipped` as counts and
    /// `Duration` in seconds, each dimensioned by the suite name only.
    pub fn suite_samples(&self) -> [MetricSample; SUITE_SAMPLE_COUNT] {
        let mut dimensions = DimensionSet::new();
        dimensions.insert(SUITE_NAME_DIMENSION, &self.sanitized_name);

        let count = |metric_name, value: usize| {
            MetricSample::new(
                metric_name,
                value as f64,
                MetricUnit::Count,
                dimensions.clone(),
            )
        };
        [
            count(MetricName::Total, self.total()),
            count(MetricName::Passed, self.passed),
            count(MetricName::Failed, self.failed),
            count(MetricName::Skipped, self.skipped),
            MetricSample::new(
                MetricName::Duration,
                self.total_duration,
                MetricUnit::Seconds,
                dimensions.clone(),
            ),
        ]
    }

    /// Returns every sample for this suite in publishing order: the suite samples, then each
    /// test case's samples in report order.
    pub fn metric_samples(&self) -> Vec<MetricSample> {
        let mut samples =
            Vec::with_capacity(SUITE_SAMPLE_COUNT + TEST_CASE_SAMPLE_COUNT * self.test_cases.len());
        samples.extend(self.suite_samples());
        for test_case in &self.test_cases {
            samples.extend(test_case.metric_samples(&self.sanitized_name));
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    fn parse(xml: &str) -> ReportDocument {
        ReportDocument::parse(xml).expect("valid report")
    }

    #[test]
    fn aggregate_counts() {
        let document = parse(indoc! {r#"
            <testsuite name="smoke">
                <testcase name="pass" time="1.5"/>
                <testcase name="fail" time="2"><failure/></testcase>
                <testcase name="skip"><skipped/></testcase>
            </testsuite>
        "#});

        let (suite, samples) =
            aggregate(&document, Utf8Path::new("report.xml")).expect("valid times");
        assert_eq!(suite.name(), "smoke");
        assert_eq!(suite.total(), 3);
        assert_eq!(suite.passed(), 1);
        assert_eq!(suite.failed(), 1);
        assert_eq!(suite.skipped(), 1);
        assert_eq!(suite.total_duration(), 3.5);
        assert_eq!(
            suite.total(),
            suite.passed() + suite.failed() + suite.skipped()
        );
        assert_eq!(samples.len(), 5 + 3 * 4);
    }

    #[test_case(StatusMarkers::default(), TestOutcome::Passed; "no markers")]
    #[test_case(StatusMarkers { failure: true, ..Default::default() }, TestOutcome::Failed; "failure")]
    #[test_case(StatusMarkers { error: true, ..Default::default() }, TestOutcome::Failed; "error")]
    #[test_case(StatusMarkers { skipped: true, ..Default::default() }, TestOutcome::Skipped; "skipped")]
    #[test_case(
        StatusMarkers { failure: true, error: true, skipped: true },
        TestOutcome::Skipped
        ; "skipped wins over failure and error"
    )]
    fn classify(markers: StatusMarkers, expected: TestOutcome) {
        assert_eq!(TestOutcome::classify(markers), expected);
    }

    #[test_case(Some("smoke"), "/ci/out/nightly_run.xml", "smoke"; "root name")]
    #[test_case(None, "/ci/out/nightly_run.xml", "nightly_run"; "missing root name")]
    #[test_case(Some(""), "/ci/out/nightly_run.xml", "nightly_run"; "empty root name")]
    #[test_case(None, "results.junit.xml", "results.junit"; "only last extension removed")]
    #[test_case(None, "/", "unknown"; "no file stem")]
    fn suite_name(root_name: Option<&str>, path: &str, expected: &str) {
        assert_eq!(resolve_suite_name(root_name, Utf8Path::new(path)), expected);
    }

    #[test_case(None, 0.0; "missing")]
    #[test_case(Some("1.25"), 1.25; "decimal")]
    #[test_case(Some(" 3 "), 3.0; "surrounding whitespace")]
    #[test_case(Some("1e-3"), 0.001; "exponent")]
    #[test_case(Some("-0"), 0.0; "negative zero")]
    fn valid_times(time: Option<&str>, expected: f64) {
        assert_eq!(parse_test_time("t", time).expect("valid time"), expected);
    }

    #[test_case("abc"; "not a number")]
    #[test_case(""; "empty")]
    #[test_case("-1.5"; "negative")]
    #[test_case("NaN"; "nan")]
    #[test_case("inf"; "infinite")]
    #[test_case("1,5"; "comma decimal")]
    fn invalid_times(time: &str) {
        let err = parse_test_time("login", Some(time)).expect_err("time should be rejected");
        assert_eq!(err.test_name(), "login");
        assert_eq!(err.value(), time);
    }

    #[test]
    fn malformed_time_fails_aggregation() {
        let document = parse(indoc! {r#"
            <testsuite name="s">
                <testcase name="ok" time="1"/>
                <testcase name="bad" time="soon"/>
            </testsuite>
        "#});
        let err = aggregate(&document, Utf8Path::new("s.xml")).expect_err("time is malformed");
        match err {
            AggregateError::InvalidTestTime(err) => assert_eq!(err.test_name(), "bad"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn overflowing_total_duration_fails_aggregation() {
        let document = parse(indoc! {r#"
            <testsuite name="slow">
                <testcase name="first" time="1e308"/>
                <testcase name="second" time="1e308"/>
            </testsuite>
        "#});
        let err = aggregate(&document, Utf8Path::new("slow.xml")).expect_err("sum overflows");
        match err {
            AggregateError::DurationOverflow { suite_name } => assert_eq!(suite_name, "slow"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_testcase_name_is_unknown() {
        let document = parse(r#"<testsuite name="s"><testcase time="1"/></testsuite>"#);
        let (suite, _) = aggregate(&document, Utf8Path::new("s.xml")).expect("valid times");
        assert_eq!(suite.test_cases()[0].name, UNKNOWN_NAME);
    }

    #[test]
    fn sample_order_for_two_tests() {
        let document = parse(indoc! {r#"
            <testsuite name="Nightly Run">
                <testcase name="first test" time="0.25"/>
                <testcase name="second" time="0.5"><error/></testcase>
            </testsuite>
        "#});
        let (_, samples) = aggregate(&document, Utf8Path::new("x.xml")).expect("valid times");

        let actual: Vec<_> = samples
            .iter()
            .map(|sample| {
                (
                    sample.metric_name.as_str(),
                    sample.value,
                    sample.unit.as_str(),
                    sample.dimensions.to_string(),
                )
            })
            .collect();

        let suite = "SuiteName=Nightly_Run";
        let first = "SuiteName=Nightly_Run,TestName=first_test";
        let second = "SuiteName=Nightly_Run,TestName=second";
        let expected = vec![
            ("Total", 2.0, "Count", suite.to_owned()),
            ("Passed", 1.0, "Count", suite.to_owned()),
            ("Failed", 1.0, "Count", suite.to_owned()),
            ("Skipped", 0.0, "Count", suite.to_owned()),
            ("Duration", 0.75, "Seconds", suite.to_owned()),
            ("Passed", 1.0, "Count", first.to_owned()),
            ("Failed", 0.0, "Count", first.to_owned()),
            ("Skipped", 0.0, "Count", first.to_owned()),
            ("Duration", 0.25, "Seconds", first.to_owned()),
            ("Passed", 0.0, "Count", second.to_owned()),
            ("Failed", 1.0, "Count", second.to_owned()),
            ("Skipped", 0.0, "Count", second.to_owned()),
            ("Duration", 0.5, "Seconds", second.to_owned()),
        ];
        assert_eq!(actual, expected);
    }

    fn status_markers() -> impl Strategy<Value = StatusMarkers> {
        (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(failure, error, skipped)| {
            StatusMarkers {
                failure,
                error,
                skipped,
            }
        })
    }

    proptest! {
        #[test]
        fn counters_always_add_up(
            cases in prop::collection::vec((status_markers(), 0.0..1000.0f64), 0..64),
        ) {
            let mut suite = TestSuite::new("suite");
            for (index, (markers, time)) in cases.iter().enumerate() {
                suite.add_test_case(TestCase::new(
                    format!("test {index}"),
                    *time,
                    TestOutcome::classify(*markers),
                ));
            }

            prop_assert_eq!(suite.total(), cases.len());
            prop_assert_eq!(suite.total(), suite.passed() + suite.failed() + suite.skipped());
            let skipped = cases.iter().filter(|(markers, _)| markers.skipped).count();
            prop_assert_eq!(suite.skipped(), skipped);
            prop_assert_eq!(suite.metric_samples().len(), 5 + 4 * cases.len());
        }
    }

    #[test]
    fn empty_suite() {
        let document = parse(r#"<testsuite name="empty"/>"#);
        let (suite, samples) = aggregate(&document, Utf8Path::new("e.xml")).expect("valid times");
        assert_eq!(suite.total(), 0);
        assert_eq!(samples.len(), 5);
        assert!(samples.iter().all(|sample| sample.value == 0.0));
    }
}
