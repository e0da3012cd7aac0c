use rust_decimal::Decimal;

use crate::domain::cart::CartItem;
use crate::errors::PricingError;
use crate::pricing::money::{checked_amount, ensure_amount};

/// Folds selected bundle children into their parent line.
///
/// Each selected child contributes its list price times its per-parent
/// quantity to the parent's list price; unselected children are dropped.
/// Children never become lines of their own. A selected child without a price
/// leaves the parent unpriced.
pub fn resolve_bundles(products: &[CartItem]) -> Result<Vec<CartItem>, PricingError> {
    products.iter().map(resolve_bundle).collect()
}

fn resolve_bundle(product: &CartItem) -> Result<CartItem, PricingError> {
    let mut resolved = product.clone();
    if product.bundle_products.is_empty() {
        return Ok(resolved);
    }

    resolved.bundle_products = product
        .bundle_products
        .iter()
        .filter(|child| child.is_selected_in_bundle())
        .cloned()
        .collect();
    if resolved.bundle_products.is_empty() {
        return Ok(resolved);
    }

    let mut child_total = Decimal::ZERO;
    for child in &resolved.bundle_products {
        match child.list_price() {
            Some(price) if !child.price_not_available => {
                let per_parent =
                    if child.quantity > Decimal::ZERO { child.quantity } else { Decimal::ONE };
                child_total += checked_amount(&child.product_id, price, per_parent)?;
                ensure_amount(&product.product_id, "bundle price", child_total)?;
            }
            _ => {
                resolved.price_not_available = true;
                return Ok(resolved);
            }
        }
    }

    if let Some(price) = product.list_price() {
        let bundle_price = price.checked_add(child_total).unwrap_or(Decimal::MAX);
        ensure_amount(&product.product_id, "bundle price", bundle_price)?;
        resolved.unit_list_price = Some(bundle_price);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::resolve_bundles;
    use crate::domain::cart::CartItem;
    use crate::errors::PricingError;
    use crate::pricing::money::MAX_AMOUNT;

    fn child(product_id: &str, price: i64, quantity: i64, selected: bool) -> CartItem {
        let mut child = CartItem::new(product_id, Decimal::from(quantity))
            .with_list_price(Decimal::from(price));
        child.is_bundle_selected_fe = selected;
        child
    }

    #[test]
    fn selected_children_fold_into_parent_price() {
        let mut parent = CartItem::new("kit", Decimal::ONE).with_list_price(Decimal::from(100));
        let mut flagged = child("cable", 5, 1, false);
        flagged.bundle_selected = true;
        parent.bundle_products =
            vec![child("lens", 40, 2, true), flagged, child("bag", 30, 1, false)];

        let resolved = resolve_bundles(&[parent.clone()]).expect("resolves");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].unit_list_price, Some(Decimal::from(185)));
        assert_eq!(resolved[0].bundle_products.len(), 2);
        assert_eq!(parent.bundle_products.len(), 3, "input must stay untouched");
    }

    #[test]
    fn nothing_selected_keeps_parent_price() {
        let mut parent = CartItem::new("kit", Decimal::ONE).with_list_price(Decimal::from(100));
        parent.bundle_products = vec![child("lens", 40, 1, false)];

        let resolved = resolve_bundles(&[parent]).expect("resolves");
        assert_eq!(resolved[0].unit_list_price, Some(Decimal::from(100)));
        assert!(resolved[0].bundle_products.is_empty());
    }

    #[test]
    fn unpriced_selected_child_marks_parent_unpriced() {
        let mut parent = CartItem::new("kit", Decimal::ONE).with_list_price(Decimal::from(100));
        let mut unpriced = CartItem::new("lens", Decimal::ONE);
        unpriced.is_bundle_selected_fe = true;
        parent.bundle_products = vec![unpriced];

        let resolved = resolve_bundles(&[parent]).expect("resolves");
        assert!(resolved[0].price_not_available);
    }

    #[test]
    fn oversized_child_contribution_is_rejected() {
        let mut parent = CartItem::new("kit", Decimal::ONE).with_list_price(Decimal::from(100));
        let mut pallet = CartItem::new("pallet", Decimal::from(1_000)).with_list_price(MAX_AMOUNT);
        pallet.bundle_selected = true;
        parent.bundle_products = vec![pallet];

        let resolved = resolve_bundles(&[parent]);
        assert!(matches!(resolved, Err(PricingError::InvalidInput(_))));
    }
}
