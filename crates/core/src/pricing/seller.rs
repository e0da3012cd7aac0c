use std::collections::BTreeMap;

use crate::domain::cart::CartItem;
use crate::domain::product::SellerId;
use crate::domain::settings::{CalculationOptions, CalculationSettings, TaxContext};
use crate::errors::PricingError;
use crate::pricing::calculator::{CalculatedCart, CartCalculator};
use crate::pricing::discount::DiscountResolver;
use crate::pricing::volume::DiscountCombinationPolicy;

/// Splits a cart by seller, keeping line order inside each group. Lines
/// without a seller share the `None` group.
pub fn group_by_seller(products: &[CartItem]) -> BTreeMap<Option<SellerId>, Vec<CartItem>> {
    let mut groups: BTreeMap<Option<SellerId>, Vec<CartItem>> = BTreeMap::new();
    for product in products {
        groups.entry(product.seller_id.clone()).or_default().push(product.clone());
    }
    groups
}

impl<D, P> CartCalculator<D, P>
where
    D: DiscountResolver,
    P: DiscountCombinationPolicy,
{
    /// One independent calculation per seller.
    pub fn calculate_by_seller(
        &self,
        products: &[CartItem],
        context: TaxContext,
        settings: &CalculationSettings,
        options: &CalculationOptions,
    ) -> Result<BTreeMap<Option<SellerId>, CalculatedCart>, PricingError> {
        group_by_seller(products)
            .into_iter()
            .map(|(seller, lines)| {
                self.calculate(&lines, context, settings, options).map(|cart| (seller, cart))
            })
            .collect()
    }
}
