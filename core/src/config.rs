//! Configuration
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. A TOML file: `--config <path>`, `STEPWISE_CONFIG_PATH`, or `stepwise.toml`
//!    in the working directory when present
//! 3. `STEPWISE_*` environment variables (`.env` files are read first), e.g.
//!    `STEPWISE_WATCH=a,b.c` or `STEPWISE_LIMITS__MAX_TICKS=100000`
//! 4. Explicit builder overrides

use crate::interpreter::executor::ExecutionLimits;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "STEPWISE";
pub const CONFIG_PATH_VAR: &str = "STEPWISE_CONFIG_PATH";
pub const DEFAULT_CONFIG_FILE: &str = "stepwise.toml";

/* ===================== Runtime Options ===================== */

/// Options a driver binds when it creates an execution
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeOptions {
    /// Watch expressions, evaluated at every checkpoint in this order
    pub watch: Vec<String>,
    pub limits: ExecutionLimits,
}

impl RuntimeOptions {
    pub fn with_watch<I, S>(watch: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            watch: watch.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Shallow merge: fields set in `patch` replace ours
    pub fn apply(&mut self, patch: OptionsPatch) {
        if let Some(watch) = patch.watch {
            self.watch = watch;
        }
        if let Some(limits) = patch.limits {
            self.limits = limits;
        }
    }
}

/// Partial update of [`RuntimeOptions`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionsPatch {
    pub watch: Option<Vec<String>>,
    pub limits: Option<ExecutionLimits>,
}

impl OptionsPatch {
    pub fn watch<I, S>(watch: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            watch: Some(watch.into_iter().map(Into::into).collect()),
            limits: None,
        }
    }
}

/* ===================== Config ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default watch expressions
    pub watch: Vec<String>,
    pub limits: ExecutionLimits,
    /// `tracing` filter used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch: Vec::new(),
            limits: ExecutionLimits::default(),
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from the default sources
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            watch: self.watch.clone(),
            limits: self.limits,
        }
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }

    fn validate(&self) -> Result<()> {
        if self.limits.max_frames == 0 {
            anyhow::bail!("limits.max_frames must be greater than zero");
        }
        if self.limits.max_ticks == 0 {
            anyhow::bail!("limits.max_ticks must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    watch: Option<Vec<String>>,
    limits: Option<ExecutionLimits>,
    skip_env: bool,
}

impl ConfigBuilder {
    /// Config file to read instead of the default search
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn watch(mut self, watch: Vec<String>) -> Self {
        self.watch = Some(watch);
        self
    }

    pub fn limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Ignore environment variables and `.env` files
    pub fn skip_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn build(self) -> Result<Config> {
        if !self.skip_env {
            // A missing .env file is fine
            let _ = dotenvy::dotenv();
        }

        let explicit_path = self.config_path.or_else(|| {
            if self.skip_env {
                None
            } else {
                std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from)
            }
        });
        let file = match &explicit_path {
            Some(path) => {
                config::File::new(&path.to_string_lossy(), config::FileFormat::Toml).required(true)
            }
            None => config::File::new(DEFAULT_CONFIG_FILE, config::FileFormat::Toml).required(false),
        };

        let mut builder = config::Config::builder().add_source(file);
        if !self.skip_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("watch")
                    .try_parsing(true),
            );
        }

        let mut config: Config = builder
            .build()
            .with_context(|| match &explicit_path {
                Some(path) => format!("Failed to read config file {}", path.display()),
                None => "Failed to load configuration".to_string(),
            })?
            .try_deserialize()
            .context("Invalid configuration")?;

        if let Some(watch) = self.watch {
            config.watch = watch;
        }
        if let Some(limits) = self.limits {
            config.limits = limits;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::builder()
            .config_path(None)
            .skip_env()
            .build()
            .expect("default config");

        assert!(config.watch.is_empty());
        assert_eq!(config.limits, ExecutionLimits::default());
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_file_then_overrides() {
        let path = std::env::temp_dir().join(format!("stepwise-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).expect("create config");
        writeln!(
            file,
            "watch = [\"total\", \"i * 2\"]\nlog_filter = \"debug\"\n\n[limits]\nmax_ticks = 1000"
        )
        .expect("write config");

        let config = Config::builder()
            .config_path(Some(path.clone()))
            .skip_env()
            .build()
            .expect("file config");
        assert_eq!(config.watch, vec!["total", "i * 2"]);
        assert_eq!(config.limits.max_ticks, 1000);
        assert_eq!(config.limits.max_frames, ExecutionLimits::default().max_frames);
        assert_eq!(config.log_filter, "debug");

        let config = Config::builder()
            .config_path(Some(path.clone()))
            .skip_env()
            .watch(vec!["x".to_string()])
            .build()
            .expect("overridden config");
        assert_eq!(config.watch, vec!["x"]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = Config::builder()
            .config_path(Some(PathBuf::from("/nonexistent/stepwise.toml")))
            .skip_env()
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let result = Config::builder()
            .skip_env()
            .limits(ExecutionLimits {
                max_frames: 10,
                max_ticks: 0,
            })
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_options_patch_is_shallow() {
        let mut options = RuntimeOptions::with_watch(["a"]);
        options.apply(OptionsPatch::default());
        assert_eq!(options.watch, vec!["a"]);

        options.apply(OptionsPatch::watch(["b", "c"]));
        assert_eq!(options.watch, vec!["b", "c"]);
        assert_eq!(options.limits, ExecutionLimits::default());
    }

    #[test]
    fn test_to_toml_round_trip() {
        let config = Config {
            watch: vec!["a".to_string()],
            ..Config::default()
        };
        let text = config.to_toml().expect("toml");
        let back: Config = toml::from_str(&text).expect("parse toml");

        assert_eq!(back, config);
    }
}
