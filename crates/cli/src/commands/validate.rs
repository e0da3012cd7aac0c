use pricebook_core::QuantityRules;
use rust_decimal::Decimal;

use super::CommandResult;

const COMMAND: &str = "validate-quantity";

pub fn run(quantity: Decimal, rules: &QuantityRules) -> CommandResult {
    match rules.validate(quantity) {
        Ok(()) => CommandResult::success(COMMAND, format!("quantity {quantity} is valid")),
        Err(message) => CommandResult::failure(COMMAND, "quantity_violation", message, 1),
    }
}
