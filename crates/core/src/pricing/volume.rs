use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::cart::CartItem;
use crate::domain::product::ProductId;
use crate::domain::settings::{CalculationSettings, TaxContext};
use crate::errors::PricingError;
use crate::pricing::money::{discounted, ensure_amount, line_amount, percentage_off, round_money};
use crate::pricing::tax::with_line_tax;

/// Decides whether a line's basic discount may be combined with a volume
/// discount.
pub trait DiscountCombinationPolicy: Send + Sync {
    fn allows_volume_discount(&self, line: &CartItem) -> bool;
}

/// A basic-discount tier flagged `CantCombineWithOtherDisCounts` wins over
/// the volume discount: the line keeps its tier price and gets no volume
/// discount. Every other line gets both, volume applied after basic.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicDiscountPrecedence;

impl DiscountCombinationPolicy for BasicDiscountPrecedence {
    fn allows_volume_discount(&self, line: &CartItem) -> bool {
        !line.applied_discount_range.as_ref().is_some_and(|range| range.cant_combine)
    }
}

/// Stacks the volume discount on every line.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysCombine;

impl DiscountCombinationPolicy for AlwaysCombine {
    fn allows_volume_discount(&self, _line: &CartItem) -> bool {
        true
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeDiscountDetails {
    /// Line totals before the volume discount.
    pub sub_total: Decimal,
    /// Line totals after the volume discount.
    pub sub_total_volume: Decimal,
    pub volume_discount_applied: Decimal,
    pub overall_tax: Decimal,
    pub taxable_amount: Decimal,
    pub total_shipping: Decimal,
    pub grand_total: Decimal,
    pub tax_totals: BTreeMap<String, Decimal>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VolumeDiscountOutcome {
    pub items: Vec<CartItem>,
    pub details: VolumeDiscountDetails,
}

pub struct VolumeDiscountCalculator<P = BasicDiscountPrecedence> {
    policy: P,
}

impl Default for VolumeDiscountCalculator<BasicDiscountPrecedence> {
    fn default() -> Self {
        Self::new(BasicDiscountPrecedence)
    }
}

impl<P: DiscountCombinationPolicy> VolumeDiscountCalculator<P> {
    pub fn new(policy: P) -> Self {
        Self { policy }
    }

    /// Applies `percentage` on top of the line's current unit price.
    ///
    /// Unpriced lines and lines the policy excludes come back with a zero
    /// volume discount and otherwise unchanged prices.
    pub fn apply_to_line(
        &self,
        line: &CartItem,
        percentage: Decimal,
        precision: u32,
    ) -> Result<CartItem, PricingError> {
        validate_percentage(&line.product_id, percentage)?;

        let mut updated = line.clone();
        updated.volume_discount = Decimal::ZERO;
        let Some(unit_price) = line.unit_price else {
            return Ok(updated);
        };
        ensure_amount(&line.product_id, "unit price", unit_price)?;

        if !percentage.is_zero() && self.policy.allows_volume_discount(line) {
            let unit_price = discounted(unit_price, percentage, precision);
            updated.unit_price = Some(unit_price);
            updated.volume_discount = percentage;
        } else if !percentage.is_zero() {
            debug!(
                event_name = "pricing.volume.skipped",
                product_id = %line.product_id,
                "basic discount tier cannot be combined with volume discount"
            );
        }

        let unit_price = updated.unit_price.unwrap_or(unit_price);
        updated.total_price =
            line_amount(&line.product_id, unit_price, updated.quantity, precision)?;
        if let Some(list_price) = updated.list_price() {
            updated.applied_discount = percentage_off(list_price, unit_price, precision);
            updated.discount = round_money(list_price - unit_price, precision);
        }
        Ok(updated)
    }

    /// Applies per-product volume discounts to basic-priced lines, re-taxes
    /// them and summarizes the cart at this stage.
    pub fn calculate(
        &self,
        items: &[CartItem],
        volume_discounts: &BTreeMap<ProductId, Decimal>,
        context: TaxContext,
        settings: &CalculationSettings,
    ) -> Result<VolumeDiscountOutcome, PricingError> {
        let precision = settings.precision;
        let mut details = VolumeDiscountDetails::default();
        let mut updated_items = Vec::with_capacity(items.len());

        for line in items {
            let percentage =
                volume_discounts.get(&line.product_id).copied().unwrap_or(Decimal::ZERO);
            let before = match line.unit_price {
                Some(unit_price) => {
                    line_amount(&line.product_id, unit_price, line.quantity, precision)?
                }
                None => Decimal::ZERO,
            };

            let discounted_line = self.apply_to_line(line, percentage, precision)?;
            if discounted_line.unit_price.is_none() {
                updated_items.push(discounted_line);
                continue;
            }
            let taxed = with_line_tax(&discounted_line, context, settings);

            details.sub_total += before;
            details.sub_total_volume += taxed.total_price;
            details.overall_tax += taxed.total_tax;
            details.taxable_amount += taxed.taxable_amount;
            details.total_shipping += taxed.shipping_charges;
            for (name, amount) in &taxed.tax_breakup {
                *details.tax_totals.entry(name.clone()).or_insert(Decimal::ZERO) += *amount;
            }
            updated_items.push(taxed);
        }

        details.volume_discount_applied = details.sub_total - details.sub_total_volume;
        details.grand_total = details.taxable_amount + details.overall_tax + details.total_shipping;

        debug!(
            event_name = "pricing.volume.applied",
            line_count = updated_items.len(),
            volume_discount_applied = %details.volume_discount_applied,
            "volume discount stage complete"
        );

        Ok(VolumeDiscountOutcome { items: updated_items, details })
    }
}

pub(crate) fn validate_percentage(
    product_id: &ProductId,
    percentage: Decimal,
) -> Result<(), PricingError> {
    if percentage < Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
        return Err(PricingError::invalid_input(format!(
            "discount percentage for product {product_id} must be within 0..=100, got {percentage}"
        )));
    }
    Ok(())
}
