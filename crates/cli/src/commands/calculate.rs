use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use pricebook_core::config::{LoadOptions, PricingConfig};
use pricebook_core::errors::ApplicationError;
use pricebook_core::pricing::CalculationRequest;
use pricebook_core::{CalculatedCart, CartCalculator};
use serde::Serialize;
use tracing::{info, warn};

use super::CommandResult;

const COMMAND: &str = "calculate";
const UNASSIGNED_SELLER: &str = "unassigned";

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum PricedCart {
    Single(CalculatedCart),
    BySeller(BTreeMap<String, CalculatedCart>),
}

pub fn run(request_path: &Path, by_seller: bool) -> CommandResult {
    let correlation_id = request_path.display().to_string();
    let (line_count, cart) = match price_request(request_path, by_seller) {
        Ok(priced) => priced,
        Err(error) => return application_failure(error, correlation_id),
    };

    match serde_json::to_value(cart) {
        Ok(value) => {
            info!(
                event_name = "cli.calculate.completed",
                correlation_id = %correlation_id,
                line_count,
                by_seller,
                "cart calculated"
            );
            CommandResult::success_with_data(
                COMMAND,
                format!("calculated {line_count} line(s)"),
                Some(value),
            )
        }
        Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 1),
    }
}

fn price_request(
    request_path: &Path,
    by_seller: bool,
) -> Result<(usize, PricedCart), ApplicationError> {
    let config = PricingConfig::load(LoadOptions::default())
        .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
    let request = read_request(request_path)
        .map_err(|error| ApplicationError::Input(format!("{error:#}")))?;

    let settings = request.settings.clone().unwrap_or_else(|| config.settings());
    let calculator = CartCalculator::default();
    let cart = if by_seller {
        let carts = calculator.calculate_by_seller(
            &request.products,
            request.context,
            &settings,
            &request.options,
        )?;
        PricedCart::BySeller(
            carts
                .into_iter()
                .map(|(seller, cart)| {
                    let key = seller
                        .map(|seller| seller.0)
                        .unwrap_or_else(|| UNASSIGNED_SELLER.to_string());
                    (key, cart)
                })
                .collect(),
        )
    } else {
        PricedCart::Single(calculator.calculate(
            &request.products,
            request.context,
            &settings,
            &request.options,
        )?)
    };

    Ok((request.products.len(), cart))
}

fn read_request(path: &Path) -> anyhow::Result<CalculationRequest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read `{}`", path.display()))?;
    serde_json::from_str::<CalculationRequest>(&raw)
        .with_context(|| format!("could not parse `{}`", path.display()))
}

fn application_failure(error: ApplicationError, correlation_id: String) -> CommandResult {
    let (error_class, exit_code) = match &error {
        ApplicationError::Configuration(_) => ("config_validation", 2),
        ApplicationError::Input(_) => ("input", 3),
        ApplicationError::Pricing(_) => ("invalid_input", 4),
    };
    let interface = error.into_interface(correlation_id.clone());
    warn!(
        event_name = "cli.calculate.failed",
        correlation_id = %correlation_id,
        error_class,
        error = %interface,
        "cart calculation failed"
    );
    CommandResult::failure(COMMAND, error_class, interface.to_string(), exit_code)
}
