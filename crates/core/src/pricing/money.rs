use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::product::ProductId;
use crate::errors::PricingError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Largest price, quantity or line amount the pipeline accepts (10^15).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Half-up rounding (midpoint away from zero) to `precision` decimal places.
pub fn round_money(amount: Decimal, precision: u32) -> Decimal {
    amount.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero).normalize()
}

pub fn percent_of(amount: Decimal, percentage: Decimal) -> Decimal {
    amount * percentage / HUNDRED
}

/// `amount` reduced by `percentage` percent, rounded.
pub fn discounted(amount: Decimal, percentage: Decimal, precision: u32) -> Decimal {
    round_money(amount - percent_of(amount, percentage), precision)
}

/// Percentage `reduced` is below `original`, zero when `original` is zero.
pub fn percentage_off(original: Decimal, reduced: Decimal, precision: u32) -> Decimal {
    if original.is_zero() {
        return Decimal::ZERO;
    }
    round_money((original - reduced) / original * HUNDRED, precision)
}

/// Rejects an input amount outside `0..=MAX_AMOUNT`.
pub fn ensure_amount(
    product_id: &ProductId,
    field: &str,
    amount: Decimal,
) -> Result<(), PricingError> {
    if amount < Decimal::ZERO || amount > MAX_AMOUNT {
        return Err(PricingError::invalid_input(format!(
            "{field} for product {product_id} must be within 0..={MAX_AMOUNT}, got {amount}"
        )));
    }
    Ok(())
}

/// `price × quantity`, failing instead of overflowing or leaving `MAX_AMOUNT`.
pub fn checked_amount(
    product_id: &ProductId,
    price: Decimal,
    quantity: Decimal,
) -> Result<Decimal, PricingError> {
    price.checked_mul(quantity).filter(|amount| amount.abs() <= MAX_AMOUNT).ok_or_else(|| {
        PricingError::invalid_input(format!(
            "amount for product {product_id} exceeds {MAX_AMOUNT}: {price} x {quantity}"
        ))
    })
}

/// Rounded line total for `unit_price × quantity`.
pub fn line_amount(
    product_id: &ProductId,
    unit_price: Decimal,
    quantity: Decimal,
    precision: u32,
) -> Result<Decimal, PricingError> {
    checked_amount(product_id, unit_price, quantity).map(|amount| round_money(amount, precision))
}
