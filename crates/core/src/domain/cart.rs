use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{ProductId, SellerId};

/// One quantity tier of a product's basic discount table. `value` is a
/// percentage off the list price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRange {
    pub min_qty: Decimal,
    pub max_qty: Decimal,
    #[serde(rename = "Value")]
    pub value: Decimal,
    #[serde(rename = "CantCombineWithOtherDisCounts", default)]
    pub cant_combine: bool,
    #[serde(rename = "pricingConditionCode", default, skip_serializing_if = "Option::is_none")]
    pub pricing_condition_code: Option<String>,
}

impl DiscountRange {
    pub fn new(min_qty: Decimal, max_qty: Decimal, value: Decimal) -> Self {
        Self { min_qty, max_qty, value, cant_combine: false, pricing_condition_code: None }
    }

    pub fn covers(&self, quantity: Decimal) -> bool {
        self.min_qty <= quantity && quantity <= self.max_qty
    }
}

/// Raw discount record attached to a line by the discount service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountSource {
    #[serde(rename = "MasterPrice", default, skip_serializing_if = "Option::is_none")]
    pub master_price: Option<Decimal>,
    #[serde(rename = "BasePrice", default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<Decimal>,
    #[serde(default)]
    pub discounts: Vec<DiscountRange>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxComponent {
    pub tax_name: String,
    pub rate: Decimal,
    #[serde(default)]
    pub compound: bool,
}

impl TaxComponent {
    pub fn new(tax_name: &str, rate: Decimal, compound: bool) -> Self {
        Self { tax_name: tax_name.to_owned(), rate, compound }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRule {
    #[serde(default)]
    pub total_tax: Decimal,
    #[serde(default)]
    pub tax_req_ls: Vec<TaxComponent>,
}

impl TaxRule {
    pub fn new(components: Vec<TaxComponent>) -> Self {
        let total_tax = components.iter().map(|component| component.rate).sum();
        Self { total_tax, tax_req_ls: components }
    }
}

/// Tax classification record for a product. Inter-state sales use
/// `inter_tax`, intra-state sales use `intra_tax`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HsnDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inter_tax: Option<TaxRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intra_tax: Option<TaxRule>,
}

impl HsnDetails {
    pub fn rule_for(&self, is_inter: bool) -> Option<&TaxRule> {
        if is_inter {
            self.inter_tax.as_ref()
        } else {
            self.intra_tax.as_ref()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryResponse {
    pub in_stock: bool,
}

/// One line of a cart, quote or order.
///
/// Money fields other than the list price are derived: the calculator
/// recomputes them on every run and ignores whatever the input carried. Lines
/// without a list price are the exception, their `original_unit_price`
/// snapshot (or first `unit_price`) is the undiscounted base.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<SellerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_no: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_no: Option<u32>,

    pub quantity: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order_quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging_quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_order_quantity: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_list_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    /// Price before volume and cash discounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_unit_price: Option<Decimal>,
    #[serde(default)]
    pub total_price: Decimal,

    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub discount_percentage: Decimal,
    #[serde(rename = "cashdiscountValue", default)]
    pub cash_discount_value: Decimal,
    #[serde(rename = "disc_prd_related_obj", default, skip_serializing_if = "Option::is_none")]
    pub discount_source: Option<DiscountSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_discount_range: Option<DiscountRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_discount_range: Option<DiscountRange>,
    #[serde(default)]
    pub volume_discount: Decimal,
    #[serde(default)]
    pub applied_discount: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsn_details: Option<HsnDetails>,
    #[serde(default)]
    pub tax_inclusive: bool,
    #[serde(default)]
    pub taxable_amount: Decimal,
    #[serde(default)]
    pub total_tax: Decimal,
    #[serde(default)]
    pub tax_breakup: BTreeMap<String, Decimal>,

    #[serde(default)]
    pub shipping_charges: Decimal,
    #[serde(default)]
    pub line_total: Decimal,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bundle_products: Vec<CartItem>,
    #[serde(default)]
    pub bundle_selected: bool,
    #[serde(rename = "isBundleSelected_fe", default)]
    pub is_bundle_selected_fe: bool,

    #[serde(default)]
    pub price_not_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_response: Option<InventoryResponse>,
}

impl CartItem {
    pub fn new(product_id: impl Into<ProductId>, quantity: Decimal) -> Self {
        Self {
            product_id: product_id.into(),
            seller_id: None,
            item_no: None,
            line_no: None,
            quantity,
            min_order_quantity: None,
            packaging_quantity: None,
            max_order_quantity: None,
            unit_list_price: None,
            unit_price: None,
            original_unit_price: None,
            total_price: Decimal::ZERO,
            discount: Decimal::ZERO,
            discount_percentage: Decimal::ZERO,
            cash_discount_value: Decimal::ZERO,
            discount_source: None,
            applied_discount_range: None,
            next_discount_range: None,
            volume_discount: Decimal::ZERO,
            applied_discount: Decimal::ZERO,
            hsn_details: None,
            tax_inclusive: false,
            taxable_amount: Decimal::ZERO,
            total_tax: Decimal::ZERO,
            tax_breakup: BTreeMap::new(),
            shipping_charges: Decimal::ZERO,
            line_total: Decimal::ZERO,
            bundle_products: Vec::new(),
            bundle_selected: false,
            is_bundle_selected_fe: false,
            price_not_available: false,
            inventory_response: None,
        }
    }

    pub fn with_list_price(mut self, price: Decimal) -> Self {
        self.unit_list_price = Some(price);
        self
    }

    pub fn with_discount_ranges(mut self, ranges: Vec<DiscountRange>) -> Self {
        self.discount_source.get_or_insert_with(DiscountSource::default).discounts = ranges;
        self
    }

    pub fn with_inter_tax(mut self, components: Vec<TaxComponent>) -> Self {
        self.hsn_details.get_or_insert_with(HsnDetails::default).inter_tax =
            Some(TaxRule::new(components));
        self
    }

    pub fn with_intra_tax(mut self, components: Vec<TaxComponent>) -> Self {
        self.hsn_details.get_or_insert_with(HsnDetails::default).intra_tax =
            Some(TaxRule::new(components));
        self
    }

    /// Catalog price the basic discount is taken from.
    pub fn list_price(&self) -> Option<Decimal> {
        self.unit_list_price.or_else(|| {
            self.discount_source
                .as_ref()
                .and_then(|source| source.base_price.or(source.master_price))
        })
    }

    pub fn discount_ranges(&self) -> &[DiscountRange] {
        self.discount_source.as_ref().map(|source| source.discounts.as_slice()).unwrap_or(&[])
    }

    /// Undiscounted unit price of a line without a list price. The snapshot
    /// wins over `unit_price`, which may already carry volume or cash discounts.
    pub fn undiscounted_unit_price(&self) -> Option<Decimal> {
        self.original_unit_price.or(self.unit_price)
    }

    pub fn is_selected_in_bundle(&self) -> bool {
        self.bundle_selected || self.is_bundle_selected_fe
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.inventory_response.as_ref().is_some_and(|inventory| !inventory.in_stock)
    }

    pub(crate) fn clear_money_fields(&mut self) {
        self.unit_price = None;
        self.total_price = Decimal::ZERO;
        self.discount = Decimal::ZERO;
        self.taxable_amount = Decimal::ZERO;
        self.total_tax = Decimal::ZERO;
        self.tax_breakup.clear();
        self.line_total = Decimal::ZERO;
    }
}
