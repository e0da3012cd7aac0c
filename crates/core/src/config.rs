use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::settings::{CalculationSettings, DEFAULT_PRECISION};

const MAX_PRECISION: u32 = 6;

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub calculation: CalculationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct CalculationConfig {
    pub precision: u32,
    pub rounding_adjustment: bool,
    pub item_wise_shipping_tax: bool,
    pub grand_total_precision: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub precision: Option<u32>,
    pub rounding_adjustment: Option<bool>,
    pub item_wise_shipping_tax: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for PricingConfig {
    fn default() -> Self {
        let settings = CalculationSettings::default();
        Self {
            calculation: CalculationConfig {
                precision: DEFAULT_PRECISION,
                rounding_adjustment: settings.rounding_adjustment,
                item_wise_shipping_tax: settings.item_wise_shipping_tax,
                grand_total_precision: settings.grand_total_precision,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl PricingConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("pricebook.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn settings(&self) -> CalculationSettings {
        CalculationSettings {
            rounding_adjustment: self.calculation.rounding_adjustment,
            item_wise_shipping_tax: self.calculation.item_wise_shipping_tax,
            precision: self.calculation.precision,
            grand_total_precision: self.calculation.grand_total_precision,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(calculation) = patch.calculation {
            if let Some(precision) = calculation.precision {
                self.calculation.precision = precision;
            }
            if let Some(rounding_adjustment) = calculation.rounding_adjustment {
                self.calculation.rounding_adjustment = rounding_adjustment;
            }
            if let Some(item_wise_shipping_tax) = calculation.item_wise_shipping_tax {
                self.calculation.item_wise_shipping_tax = item_wise_shipping_tax;
            }
            if let Some(grand_total_precision) = calculation.grand_total_precision {
                self.calculation.grand_total_precision = grand_total_precision;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PRICEBOOK_PRECISION") {
            self.calculation.precision = parse_u32("PRICEBOOK_PRECISION", &value)?;
        }
        if let Some(value) = read_env("PRICEBOOK_ROUNDING_ADJUSTMENT") {
            self.calculation.rounding_adjustment =
                parse_bool("PRICEBOOK_ROUNDING_ADJUSTMENT", &value)?;
        }
        if let Some(value) = read_env("PRICEBOOK_ITEM_WISE_SHIPPING_TAX") {
            self.calculation.item_wise_shipping_tax =
                parse_bool("PRICEBOOK_ITEM_WISE_SHIPPING_TAX", &value)?;
        }
        if let Some(value) = read_env("PRICEBOOK_GRAND_TOTAL_PRECISION") {
            self.calculation.grand_total_precision =
                parse_u32("PRICEBOOK_GRAND_TOTAL_PRECISION", &value)?;
        }

        let log_level =
            read_env("PRICEBOOK_LOGGING_LEVEL").or_else(|| read_env("PRICEBOOK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PRICEBOOK_LOGGING_FORMAT").or_else(|| read_env("PRICEBOOK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(precision) = overrides.precision {
            self.calculation.precision = precision;
        }
        if let Some(rounding_adjustment) = overrides.rounding_adjustment {
            self.calculation.rounding_adjustment = rounding_adjustment;
        }
        if let Some(item_wise_shipping_tax) = overrides.item_wise_shipping_tax {
            self.calculation.item_wise_shipping_tax = item_wise_shipping_tax;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_calculation(&self.calculation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("pricebook.toml"), PathBuf::from("config/pricebook.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_calculation(calculation: &CalculationConfig) -> Result<(), ConfigError> {
    if calculation.precision > MAX_PRECISION {
        return Err(ConfigError::Validation(format!(
            "calculation.precision must be in range 0..={MAX_PRECISION}"
        )));
    }

    if calculation.grand_total_precision > calculation.precision {
        return Err(ConfigError::Validation(
            "calculation.grand_total_precision cannot exceed calculation.precision".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    calculation: Option<CalculationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CalculationPatch {
    precision: Option<u32>,
    rounding_adjustment: Option<bool>,
    item_wise_shipping_tax: Option<bool>,
    grand_total_precision: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
