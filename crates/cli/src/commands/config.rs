use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use pricebook_core::config::{LoadOptions, PricingConfig};
use toml::Value;

pub fn run() -> String {
    let config = match PricingConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "calculation.precision",
        &config.calculation.precision.to_string(),
        source("calculation.precision", &["PRICEBOOK_PRECISION"]),
    ));
    lines.push(render_line(
        "calculation.rounding_adjustment",
        &config.calculation.rounding_adjustment.to_string(),
        source("calculation.rounding_adjustment", &["PRICEBOOK_ROUNDING_ADJUSTMENT"]),
    ));
    lines.push(render_line(
        "calculation.item_wise_shipping_tax",
        &config.calculation.item_wise_shipping_tax.to_string(),
        source("calculation.item_wise_shipping_tax", &["PRICEBOOK_ITEM_WISE_SHIPPING_TAX"]),
    ));
    lines.push(render_line(
        "calculation.grand_total_precision",
        &config.calculation.grand_total_precision.to_string(),
        source("calculation.grand_total_precision", &["PRICEBOOK_GRAND_TOTAL_PRECISION"]),
    ));
    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["PRICEBOOK_LOGGING_LEVEL", "PRICEBOOK_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["PRICEBOOK_LOGGING_FORMAT", "PRICEBOOK_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("pricebook.toml"), PathBuf::from("config/pricebook.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
