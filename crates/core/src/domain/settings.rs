use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;

pub const DEFAULT_PRECISION: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalculationSettings {
    /// Round the grand total to `grand_total_precision` and report the
    /// difference as the rounding adjustment.
    pub rounding_adjustment: bool,
    /// Tax line shipping with the line's own tax components.
    pub item_wise_shipping_tax: bool,
    pub precision: u32,
    pub grand_total_precision: u32,
}

impl Default for CalculationSettings {
    fn default() -> Self {
        Self {
            rounding_adjustment: true,
            item_wise_shipping_tax: false,
            precision: DEFAULT_PRECISION,
            grand_total_precision: 0,
        }
    }
}

/// Jurisdiction flags for a sale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxContext {
    pub is_inter: bool,
    pub tax_exemption: bool,
}

impl TaxContext {
    pub fn new(is_inter: bool, tax_exemption: bool) -> Self {
        Self { is_inter, tax_exemption }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalculationOptions {
    pub apply_volume_discount: bool,
    /// Volume discount percentage per product, usually derived from the
    /// buying company's volume agreement.
    pub volume_discounts: BTreeMap<ProductId, Decimal>,
    pub insurance_charges: Decimal,
    /// Packaging and forwarding charge as a percentage of the taxable amount.
    pub pf_percentage: Decimal,
}
