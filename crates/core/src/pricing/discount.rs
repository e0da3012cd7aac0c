use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cart::DiscountRange;
use crate::errors::PricingError;

/// Outcome of a tier lookup for one quantity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountResolution {
    /// Best covering tier; `None` when the quantity falls into a gap.
    pub suitable_discount: Option<DiscountRange>,
    /// Nearest tier that starts above the quantity.
    pub next_suitable_discount: Option<DiscountRange>,
}

impl DiscountResolution {
    pub fn discount_percentage(&self) -> Decimal {
        self.suitable_discount.as_ref().map(|range| range.value).unwrap_or(Decimal::ZERO)
    }

    /// Units to add before the next tier starts.
    pub fn quantity_to_next_tier(&self, quantity: Decimal) -> Option<Decimal> {
        self.next_suitable_discount.as_ref().map(|range| range.min_qty - quantity)
    }
}

pub trait DiscountResolver: Send + Sync {
    fn resolve(
        &self,
        quantity: Decimal,
        ranges: &[DiscountRange],
    ) -> Result<DiscountResolution, PricingError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TieredDiscountResolver;

impl DiscountResolver for TieredDiscountResolver {
    fn resolve(
        &self,
        quantity: Decimal,
        ranges: &[DiscountRange],
    ) -> Result<DiscountResolution, PricingError> {
        resolve_discount(quantity, ranges)
    }
}

/// Picks the covering tier with the highest value and the next tier up.
///
/// Ranges may overlap or leave gaps. When several covering tiers share the
/// highest value, the first one in input order wins; likewise the first of
/// several upcoming tiers with the same `min_qty`.
pub fn resolve_discount(
    quantity: Decimal,
    ranges: &[DiscountRange],
) -> Result<DiscountResolution, PricingError> {
    if quantity <= Decimal::ZERO {
        return Err(PricingError::invalid_input(format!(
            "quantity must be greater than zero, got {quantity}"
        )));
    }
    if ranges.is_empty() {
        return Err(PricingError::invalid_input("discount range list is empty"));
    }

    let mut suitable: Option<&DiscountRange> = None;
    let mut next: Option<&DiscountRange> = None;

    for range in ranges {
        if range.covers(quantity) {
            if suitable.map_or(true, |best| range.value > best.value) {
                suitable = Some(range);
            }
        } else if range.min_qty > quantity
            && next.map_or(true, |closest| range.min_qty < closest.min_qty)
        {
            next = Some(range);
        }
    }

    Ok(DiscountResolution {
        suitable_discount: suitable.cloned(),
        next_suitable_discount: next.cloned(),
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::resolve_discount;
    use crate::domain::cart::DiscountRange;
    use crate::errors::PricingError;

    fn range(min: i64, max: i64, value: i64) -> DiscountRange {
        DiscountRange::new(Decimal::from(min), Decimal::from(max), Decimal::from(value))
    }

    #[test]
    fn same_tier_resolves_identically_for_every_quantity_in_it() {
        let ranges = vec![range(1, 10, 5), range(11, 50, 10), range(51, 100, 15)];
        let expected = resolve_discount(Decimal::from(11), &ranges).expect("resolves");
        for quantity in 11..=50 {
            let resolution = resolve_discount(Decimal::from(quantity), &ranges).expect("resolves");
            assert_eq!(resolution.suitable_discount, expected.suitable_discount);
        }
    }

    #[test]
    fn looks_ahead_to_next_tier() {
        let ranges = vec![range(1, 10, 5), range(11, 50, 10)];
        let resolution = resolve_discount(Decimal::from(8), &ranges).expect("resolves");

        assert_eq!(resolution.discount_percentage(), Decimal::from(5));
        let next = resolution.next_suitable_discount.as_ref().expect("next tier");
        assert_eq!(next.min_qty, Decimal::from(11));
        assert_eq!(resolution.quantity_to_next_tier(Decimal::from(8)), Some(Decimal::from(3)));
    }

    #[test]
    fn gap_yields_no_discount_but_still_finds_next_tier() {
        let ranges = vec![range(1, 10, 5), range(51, 100, 15)];
        let resolution = resolve_discount(Decimal::from(25), &ranges).expect("resolves");

        assert!(resolution.suitable_discount.is_none());
        assert_eq!(resolution.discount_percentage(), Decimal::ZERO);
        assert_eq!(
            resolution.next_suitable_discount.map(|range| range.min_qty),
            Some(Decimal::from(51))
        );
    }

    #[test]
    fn overlapping_tiers_pick_highest_value() {
        let ranges = vec![range(1, 100, 5), range(10, 20, 12), range(15, 30, 8)];
        let resolution = resolve_discount(Decimal::from(16), &ranges).expect("resolves");
        assert_eq!(resolution.discount_percentage(), Decimal::from(12));
    }

    #[test]
    fn equal_values_keep_first_encountered_range() {
        let mut first = range(1, 20, 10);
        first.pricing_condition_code = Some("first".to_owned());
        let mut second = range(5, 20, 10);
        second.pricing_condition_code = Some("second".to_owned());

        let resolution =
            resolve_discount(Decimal::from(8), &[first, second]).expect("resolves");
        let chosen = resolution.suitable_discount.expect("covering tier");
        assert_eq!(chosen.pricing_condition_code.as_deref(), Some("first"));
    }

    #[test]
    fn quantity_above_every_tier_has_no_next_tier() {
        let ranges = vec![range(1, 10, 5)];
        let resolution = resolve_discount(Decimal::from(500), &ranges).expect("resolves");
        assert_eq!(resolution, Default::default());
    }

    #[test]
    fn rejects_non_positive_quantity_and_empty_ranges() {
        let ranges = vec![range(1, 10, 5)];
        assert!(matches!(
            resolve_discount(Decimal::ZERO, &ranges),
            Err(PricingError::InvalidInput(_))
        ));
        assert!(matches!(
            resolve_discount(Decimal::NEGATIVE_ONE, &ranges),
            Err(PricingError::InvalidInput(_))
        ));
        assert!(matches!(resolve_discount(Decimal::ONE, &[]), Err(PricingError::InvalidInput(_))));
    }
}
