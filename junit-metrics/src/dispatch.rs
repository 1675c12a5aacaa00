// Copyright (c) The junit-metrics Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    JunitMetricsExitCode,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser};
use junit_metrics_runner::{
    aggregate::aggregate,
    config::{MetricsConfig, PublishConfig},
    publish::publish,
    report::ReportDocument,
    sink::{CloudWatchSink, DryRunSink, MetricsSink},
};
use tracing::{debug, info};

/// Publish test outcomes and durations from a JUnit XML report as CloudWatch metrics.
///
/// Every sample is submitted by running `aws cloudwatch put-metric-data`, one invocation per
/// sample, so the AWS CLI must be installed and configured with credentials.
#[derive(Debug, Parser)]
#[command(
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct JunitMetricsApp {
    /// Path to the JUnit XML report
    #[arg(value_name = "REPORT")]
    report: Utf8PathBuf,

    #[clap(flatten)]
    config_opts: ConfigOpts,

    #[clap(flatten)]
    publish_opts: PublishOpts,

    #[clap(flatten)]
    output: OutputOpts,
}

impl JunitMetricsApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let config = self.config_opts.make_config(Utf8Path::new("."))?;
        let mut publish_config = config.publish_config();
        self.publish_opts.apply(&mut publish_config);
        debug!(
            "publishing to namespace `{}` in region `{}` via `{}`",
            publish_config.namespace(),
            publish_config.region(),
            publish_config.command(),
        );

        let document = ReportDocument::from_path(&self.report)?;
        let (suite, samples) = aggregate(&document, &self.report)?;
        debug!(
            "report `{}` has {} test cases, {} samples to submit",
            self.report,
            suite.total(),
            samples.len(),
        );

        let mut sink: Box<dyn MetricsSink> = if self.publish_opts.dry_run {
            info!("dry run: no metrics will be submitted");
            Box::new(DryRunSink::new(publish_config))
        } else {
            Box::new(CloudWatchSink::new(publish_config))
        };

        let mut writer = output_writer.stdout_writer();
        publish(
            &suite,
            &samples,
            sink.as_mut(),
            &mut writer,
            &output.publish_styles(),
        )?;

        Ok(JunitMetricsExitCode::OK)
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
struct ConfigOpts {
    /// Config file [default: .config/junit-metrics.toml in the current directory]
    #[arg(long, value_name = "PATH", env = "JUNIT_METRICS_CONFIG_FILE")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn make_config(&self, root: &Utf8Path) -> Result<MetricsConfig> {
        Ok(MetricsConfig::from_sources(root, self.config_file.as_deref())?)
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Publish options")]
struct PublishOpts {
    /// AWS region to publish to [default: us-east-1]
    #[arg(long, value_name = "REGION", env = "JUNIT_METRICS_REGION")]
    region: Option<String>,

    /// CloudWatch namespace for all metrics [default: DocspaceIO/Autotests]
    #[arg(long, value_name = "NAMESPACE", env = "JUNIT_METRICS_NAMESPACE")]
    namespace: Option<String>,

    /// AWS CLI executable used to submit metrics [default: aws]
    #[arg(long, value_name = "PROGRAM", env = "JUNIT_METRICS_AWS_COMMAND")]
    aws_command: Option<String>,

    /// Print the commands that would be run instead of submitting metrics
    #[arg(long)]
    dry_run: bool,
}

impl PublishOpts {
    fn apply(&self, config: &mut PublishConfig) {
        if let Some(region) = &self.region {
            config.set_region(region);
        }
        if let Some(namespace) = &self.namespace {
            config.set_namespace(namespace);
        }
        if let Some(aws_command) = &self.aws_command {
            config.set_command(aws_command);
        }
    }
}

/// Prints a command-line parse error and returns the exit code for it.
///
/// Help and version requests exit successfully. Every other parse error is a usage error.
pub fn handle_clap_error(err: clap::Error) -> i32 {
    use clap::error::ErrorKind;

    let _ = err.print();
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        | ErrorKind::DisplayVersion => JunitMetricsExitCode::OK,
        _ => JunitMetricsExitCode::USAGE_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::ExpectedError, output::Color};
    use clap::error::ErrorKind;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn fixture(name: &str) -> String {
        Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../fixtures/reports")
            .join(name)
            .into_string()
    }

    fn plain_output() -> OutputContext {
        OutputContext {
            color: Color::Never,
        }
    }

    fn run(args: &[&str]) -> (Result<i32>, String) {
        let app = JunitMetricsApp::try_parse_from(
            std::iter::once("junit-metrics").chain(args.iter().copied()),
        )
        .expect("arguments are valid");
        let mut output_writer = OutputWriter::Test { stdout: Vec::new() };
        let result = app.exec(plain_output(), &mut output_writer);
        let OutputWriter::Test { stdout } = output_writer else {
            unreachable!("writer was created as a test writer");
        };
        (result, String::from_utf8(stdout).expect("output is UTF-8"))
    }

    #[test]
    fn verify_app() {
        use clap::CommandFactory;
        JunitMetricsApp::command().debug_assert();
    }

    #[test]
    fn dry_run_prints_summary() {
        let report = fixture("nightly_run.xml");
        let (result, stdout) = run(&["--dry-run", &report]);
        assert_eq!(result.expect("dry run succeeds"), JunitMetricsExitCode::OK);
        assert_eq!(
            stdout,
            indoc! {"
                nightly_run - total: 3, passed: 1, failed: 1, skipped: 1 - 3.75s
                nightly_run/login_works - PASSED - 1.50s
                nightly_run/upload_fails - FAILED - 2.25s
                nightly_run/flaky - SKIPPED - 0.00s
            "}
        );
    }

    #[test]
    fn config_file_and_overrides() {
        let dir = camino_tempfile::tempdir().expect("created temp dir");
        let config_file = dir.path().join("junit-metrics.toml");
        std::fs::write(
            &config_file,
            indoc! {r#"
                [cloudwatch]
                region = "eu-west-1"
                namespace = "Team/Nightly"
            "#},
        )
        .expect("wrote config");

        let app = JunitMetricsApp::try_parse_from([
            "junit-metrics",
            "--config-file",
            config_file.as_str(),
            "--region",
            "ap-south-1",
            "report.xml",
        ])
        .expect("arguments are valid");

        let config = app
            .config_opts
            .make_config(dir.path())
            .expect("config is valid");
        let mut publish_config = config.publish_config();
        app.publish_opts.apply(&mut publish_config);
        assert_eq!(
            publish_config,
            PublishConfig::new("ap-south-1", "Team/Nightly", "aws")
        );
    }

    #[test]
    fn missing_report_is_an_error() {
        let report = fixture("does-not-exist.xml");
        let (result, stdout) = run(&["--dry-run", &report]);
        let err = result.expect_err("missing report fails");
        assert!(
            matches!(err, ExpectedError::ReportLoadError { .. }),
            "unexpected error: {err:?}"
        );
        assert_eq!(
            err.process_exit_code(),
            JunitMetricsExitCode::REPORT_READ_FAILED
        );
        assert_eq!(stdout, "");
    }

    #[test]
    fn malformed_report_is_an_error() {
        let report = fixture("malformed.xml");
        let (result, _) = run(&["--dry-run", &report]);
        let err = result.expect_err("malformed report fails");
        assert_eq!(
            err.process_exit_code(),
            JunitMetricsExitCode::REPORT_PARSE_FAILED
        );
    }

    #[test]
    fn invalid_time_publishes_nothing() {
        let report = fixture("bad-time.xml");
        let (result, stdout) = run(&["--dry-run", &report]);
        let err = result.expect_err("invalid time fails");
        assert_eq!(
            err.process_exit_code(),
            JunitMetricsExitCode::INVALID_TEST_TIME
        );
        assert_eq!(stdout, "", "nothing is printed before aggregation succeeds");
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_exit_code_is_forwarded() {
        let report = fixture("nightly_run.xml");
        let (result, stdout) = run(&["--aws-command", "false", &report]);
        let err = result.expect_err("`false` fails");
        assert_eq!(err.process_exit_code(), 1);
        assert_eq!(
            stdout,
            "nightly_run - total: 3, passed: 1, failed: 1, skipped: 1 - 3.75s\n"
        );
    }

    #[test]
    fn missing_command_is_a_submission_failure() {
        let report = fixture("nightly_run.xml");
        let (result, _) = run(&["--aws-command", "junit-metrics-no-such-aws", &report]);
        let err = result.expect_err("missing program fails");
        assert_eq!(
            err.process_exit_code(),
            JunitMetricsExitCode::SUBMISSION_FAILED
        );
    }

    #[test]
    fn color_reads_its_own_environment_variable() {
        use clap::CommandFactory;
        let command = JunitMetricsApp::command();
        let color = command
            .get_arguments()
            .find(|arg| arg.get_id() == "color")
            .expect("color argument exists");
        assert_eq!(
            color.get_env(),
            Some(std::ffi::OsStr::new("JUNIT_METRICS_COLOR"))
        );
    }

    #[test]
    fn latin1_report_dry_run() {
        let report = fixture("latin1-encoded.xml");
        let (result, stdout) = run(&["--dry-run", &report]);
        assert_eq!(result.expect("dry run succeeds"), JunitMetricsExitCode::OK);
        assert_eq!(
            stdout,
            indoc! {"
                Regression_nocturne - total: 2, passed: 1, failed: 1, skipped: 0 - 2.25s
                Regression_nocturne/Connexion_reussie - PASSED - 0.75s
                Regression_nocturne/Televersement_echoue - FAILED - 1.50s
            "}
        );
    }

    #[test]
    fn usage_errors() {
        let err = JunitMetricsApp::try_parse_from(["junit-metrics"])
            .expect_err("report argument is required");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = JunitMetricsApp::try_parse_from(["junit-metrics", "a.xml", "b.xml"])
            .expect_err("only one report is accepted");
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);

        let err = JunitMetricsApp::try_parse_from(["junit-metrics", "--help"])
            .expect_err("help is reported as an error");
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }
}
