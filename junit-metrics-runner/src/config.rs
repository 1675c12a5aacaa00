// Copyright (c) The junit-metrics Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for junit-metrics.

use crate::errors::{ConfigParseError, ConfigParseErrorKind};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use tracing::debug;

/// Overall configuration for junit-metrics.
///
/// The built-in [default config](Self::DEFAULT_CONFIG) is always loaded first. A config file is
/// layered on top of it, and command-line overrides are applied to the resulting
/// [`PublishConfig`].
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    config_file: Utf8PathBuf,
    inner: MetricsConfigImpl,
}

impl MetricsConfig {
    /// The default location of the config within a directory: `.config/junit-metrics.toml`.
    pub const CONFIG_PATH: &'static str = ".config/junit-metrics.toml";

    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from `config_file`, or if not specified from `.config/junit-metrics.toml`
    /// under `root`.
    ///
    /// An explicitly specified file must exist. If it isn't specified and the default location
    /// has no file, the default config is used.
    pub fn from_sources(
        root: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let inner = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        debug!("loaded config (file: `{config_file}`): {inner:?}");

        Ok(Self { config_file, inner })
    }

    /// Returns the default config.
    pub fn default_config() -> Self {
        let inner = Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid");
        Self {
            config_file: Utf8PathBuf::from("<default config>"),
            inner,
        }
    }

    /// Returns the path of the config file that was layered over the defaults.
    ///
    /// This file may not exist if it was not explicitly specified.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the settings used to publish metrics.
    pub fn publish_config(&self) -> PublishConfig {
        let CloudWatchConfigImpl {
            region,
            namespace,
            command,
        } = &self.inner.cloudwatch;
        PublishConfig::new(region, namespace, command)
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<MetricsConfigImpl, ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|err| ConfigParseErrorKind::BuildError(Box::new(err)))?;

        serde_path_to_error::deserialize(config)
            .map_err(|err| ConfigParseErrorKind::DeserializeError(Box::new(err)))
    }
}

/// Settings for submitting samples to CloudWatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishConfig {
    region: String,
    namespace: String,
    command: String,
}

impl PublishConfig {
    /// Creates a new `PublishConfig`.
    pub fn new(
        region: impl Into<String>,
        namespace: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            namespace: namespace.into(),
            command: command.into(),
        }
    }

    /// The AWS region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The CloudWatch namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The AWS CLI executable.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Overrides the region.
    pub fn set_region(&mut self, region: impl Into<String>) -> &mut Self {
        self.region = region.into();
        self
    }

    /// Overrides the namespace.
    pub fn set_namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.namespace = namespace.into();
        self
    }

    /// Overrides the AWS CLI executable.
    pub fn set_command(&mut self, command: impl Into<String>) -> &mut Self {
        self.command = command.into();
        self
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct MetricsConfigImpl {
    cloudwatch: CloudWatchConfigImpl,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct CloudWatchConfigImpl {
    region: String,
    namespace: String,
    command: String,
}
