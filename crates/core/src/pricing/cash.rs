use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::cart::CartItem;
use crate::errors::PricingError;
use crate::pricing::money::{discounted, ensure_amount};
use crate::pricing::volume::validate_percentage;

/// Applies and reverses a payment-term cash discount across a cart.
///
/// Neither operation recomputes totals; run the cart calculator afterwards.
#[derive(Clone, Copy, Debug)]
pub struct CashDiscountApplier {
    precision: u32,
}

impl CashDiscountApplier {
    pub fn new(precision: u32) -> Self {
        Self { precision }
    }

    /// Snapshots each priced line's `unit_price` into `original_unit_price`
    /// (first application only) and prices the line from that snapshot.
    pub fn apply(
        &self,
        products: &[CartItem],
        cash_discount_value: Decimal,
    ) -> Result<Vec<CartItem>, PricingError> {
        validate_cart(products, cash_discount_value)?;
        let updated: Vec<CartItem> = products
            .iter()
            .map(|product| {
                let mut updated = product.clone();
                if updated.original_unit_price.is_none() {
                    updated.original_unit_price = updated.unit_price;
                }
                updated.cash_discount_value = cash_discount_value;
                if let Some(original) = updated.original_unit_price {
                    updated.unit_price =
                        Some(discounted(original, cash_discount_value, self.precision));
                }
                updated
            })
            .collect();

        debug!(
            event_name = "pricing.cash_discount.applied",
            line_count = updated.len(),
            cash_discount_value = %cash_discount_value,
            "cash discount applied"
        );
        Ok(updated)
    }

    /// Restores `unit_price` from the snapshot and clears the discount. Lines
    /// that never had a discount applied come back unchanged.
    pub fn remove(&self, products: &[CartItem]) -> Vec<CartItem> {
        products
            .iter()
            .map(|product| {
                let mut updated = product.clone();
                if let Some(original) = updated.original_unit_price {
                    updated.unit_price = Some(original);
                }
                updated.cash_discount_value = Decimal::ZERO;
                updated
            })
            .collect()
    }
}

fn validate_cart(products: &[CartItem], cash_discount_value: Decimal) -> Result<(), PricingError> {
    products.iter().try_for_each(|product| {
        validate_percentage(&product.product_id, cash_discount_value)?;
        match product.original_unit_price.or(product.unit_price) {
            Some(price) => ensure_amount(&product.product_id, "unit price", price),
            None => Ok(()),
        }
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::CashDiscountApplier;
    use crate::domain::cart::CartItem;
    use crate::errors::PricingError;

    fn priced(product_id: &str, unit_price: Decimal) -> CartItem {
        let mut item = CartItem::new(product_id, Decimal::ONE);
        item.unit_price = Some(unit_price);
        item
    }

    #[test]
    fn repeated_apply_then_remove_restores_exact_prices() {
        let applier = CashDiscountApplier::new(2);
        let items = vec![
            priced("p-1", Decimal::new(9999, 2)),
            priced("p-2", Decimal::new(1333, 2)),
            priced("p-3", Decimal::new(1, 2)),
        ];

        let once = applier.apply(&items, Decimal::from(5)).expect("applies");
        let twice = applier.apply(&once, Decimal::from(5)).expect("applies");
        assert_eq!(once, twice, "second apply must not compound");

        let restored = applier.remove(&twice);
        for (before, after) in items.iter().zip(&restored) {
            assert_eq!(before.unit_price, after.unit_price);
            assert_eq!(after.cash_discount_value, Decimal::ZERO);
        }
    }

    #[test]
    fn apply_snapshots_original_price_once() {
        let applier = CashDiscountApplier::new(2);
        let items = vec![priced("p-1", Decimal::from(200))];

        let first = applier.apply(&items, Decimal::from(5)).expect("applies");
        assert_eq!(first[0].original_unit_price, Some(Decimal::from(200)));
        assert_eq!(first[0].unit_price, Some(Decimal::from(190)));

        let changed_terms = applier.apply(&first, Decimal::from(2)).expect("applies");
        assert_eq!(changed_terms[0].original_unit_price, Some(Decimal::from(200)));
        assert_eq!(changed_terms[0].unit_price, Some(Decimal::from(196)));
        assert_eq!(items[0].original_unit_price, None, "input must stay untouched");
    }

    #[test]
    fn remove_without_prior_apply_is_a_no_op() {
        let applier = CashDiscountApplier::new(2);
        let items = vec![priced("p-1", Decimal::from(50))];

        let removed = applier.remove(&items);
        assert_eq!(removed, items);
    }

    #[test]
    fn unpriced_lines_only_record_the_discount() {
        let applier = CashDiscountApplier::new(2);
        let items = vec![CartItem::new("p-1", Decimal::ONE)];

        let applied = applier.apply(&items, Decimal::from(3)).expect("applies");
        assert_eq!(applied[0].unit_price, None);
        assert_eq!(applied[0].cash_discount_value, Decimal::from(3));
    }

    #[test]
    fn rejects_discount_above_one_hundred_percent() {
        let applier = CashDiscountApplier::new(2);
        let items = vec![priced("p-1", Decimal::from(50))];
        assert!(matches!(
            applier.apply(&items, Decimal::from(120)),
            Err(PricingError::InvalidInput(_))
        ));
    }
}
