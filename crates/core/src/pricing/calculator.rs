use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::cart::CartItem;
use crate::domain::product::ProductId;
use crate::domain::settings::{CalculationOptions, CalculationSettings, TaxContext};
use crate::errors::PricingError;
use crate::pricing::bundle::resolve_bundles;
use crate::pricing::discount::{DiscountResolver, TieredDiscountResolver};
use crate::pricing::money::{
    discounted, ensure_amount, line_amount, percent_of, percentage_off, round_money, MAX_AMOUNT,
};
use crate::pricing::tax::{applicable_rule, with_line_tax};
use crate::pricing::volume::{
    validate_percentage, BasicDiscountPrecedence, DiscountCombinationPolicy,
    VolumeDiscountCalculator, VolumeDiscountDetails,
};

/// Cart-level totals. `tax_totals` holds one entry per tax name seen in the
/// cart (IGST, CGST, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartValue {
    pub total_items: usize,
    pub total_value: Decimal,
    pub total_discount: Decimal,
    pub taxable_amount: Decimal,
    pub total_tax: Decimal,
    pub total_shipping: Decimal,
    pub pf_rate: Decimal,
    pub insurance_charges: Decimal,
    pub calculated_total: Decimal,
    pub rounding_adjustment: Decimal,
    pub grand_total: Decimal,
    pub tax_totals: BTreeMap<String, Decimal>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    PriceNotAvailable,
    OutOfStock,
    TaxRuleMissing,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationWarning {
    pub code: WarningCode,
    pub product_id: ProductId,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationMetadata {
    pub total_products: usize,
    pub priced_products: usize,
    pub is_inter: bool,
    pub tax_exemption: bool,
    pub precision: u32,
    pub volume_discount_applied: bool,
    pub cash_discount_applied: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatedCart {
    pub products: Vec<CartItem>,
    pub cart_value: CartValue,
    pub metadata: CalculationMetadata,
    pub warnings: Vec<CalculationWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_discount: Option<VolumeDiscountDetails>,
}

/// Runs the pricing pipeline over a cart:
/// bundles, basic discount, volume discount, cash discount, tax, then
/// shipping, PF, insurance and rounding during aggregation.
///
/// Every stage returns fresh lines; the input slice is never modified.
pub struct CartCalculator<D = TieredDiscountResolver, P = BasicDiscountPrecedence> {
    discount_resolver: D,
    volume: VolumeDiscountCalculator<P>,
}

impl Default for CartCalculator<TieredDiscountResolver, BasicDiscountPrecedence> {
    fn default() -> Self {
        Self::new(TieredDiscountResolver, BasicDiscountPrecedence)
    }
}

impl<D, P> CartCalculator<D, P>
where
    D: DiscountResolver,
    P: DiscountCombinationPolicy,
{
    pub fn new(discount_resolver: D, combination_policy: P) -> Self {
        Self { discount_resolver, volume: VolumeDiscountCalculator::new(combination_policy) }
    }

    pub fn calculate(
        &self,
        products: &[CartItem],
        context: TaxContext,
        settings: &CalculationSettings,
        options: &CalculationOptions,
    ) -> Result<CalculatedCart, PricingError> {
        validate_inputs(products, options)?;
        let precision = settings.precision;

        let bundled = resolve_bundles(products)?;
        let basic = bundled
            .iter()
            .map(|line| self.apply_basic_discount(line, precision))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(event_name = "pricing.stage.basic_discount", line_count = basic.len());

        let (volume_priced, volume_details) = if options.apply_volume_discount {
            let outcome =
                self.volume.calculate(&basic, &options.volume_discounts, context, settings)?;
            (outcome.items, Some(outcome.details))
        } else {
            (basic, None)
        };

        let cash_priced = volume_priced
            .iter()
            .map(|line| apply_cash_discount(line, precision))
            .collect::<Result<Vec<_>, _>>()?;

        let taxed: Vec<CartItem> = cash_priced
            .iter()
            .map(|line| {
                if is_priced(line) {
                    with_line_tax(line, context, settings)
                } else {
                    line.clone()
                }
            })
            .collect();
        debug!(event_name = "pricing.stage.tax", line_count = taxed.len());

        let warnings = collect_warnings(&taxed, context);
        let cart_value = aggregate(&taxed, settings, options);
        let metadata = CalculationMetadata {
            total_products: taxed.len(),
            priced_products: cart_value.total_items,
            is_inter: context.is_inter,
            tax_exemption: context.tax_exemption,
            precision,
            volume_discount_applied: taxed.iter().any(|line| !line.volume_discount.is_zero()),
            cash_discount_applied: taxed
                .iter()
                .any(|line| is_priced(line) && !line.cash_discount_value.is_zero()),
        };

        debug!(
            event_name = "pricing.cart.calculated",
            total_products = metadata.total_products,
            warning_count = warnings.len(),
            grand_total = %cart_value.grand_total,
            "cart calculated"
        );

        Ok(CalculatedCart {
            products: taxed,
            cart_value,
            metadata,
            warnings,
            volume_discount: volume_details,
        })
    }

    fn apply_basic_discount(
        &self,
        line: &CartItem,
        precision: u32,
    ) -> Result<CartItem, PricingError> {
        let mut priced = line.clone();
        priced.applied_discount_range = None;
        priced.next_discount_range = None;
        priced.volume_discount = Decimal::ZERO;
        priced.applied_discount = Decimal::ZERO;

        if line.price_not_available {
            priced.clear_money_fields();
            return Ok(priced);
        }

        let unit_price = match line.list_price() {
            Some(list_price) => {
                let ranges = line.discount_ranges();
                let percentage = if ranges.is_empty() {
                    line.discount_percentage
                } else {
                    let resolution = self.discount_resolver.resolve(line.quantity, ranges)?;
                    let percentage = resolution.discount_percentage();
                    priced.applied_discount_range = resolution.suitable_discount;
                    priced.next_discount_range = resolution.next_suitable_discount;
                    percentage
                };
                validate_percentage(&line.product_id, percentage)?;

                // Bounds `discount × quantity` in the cart totals.
                line_amount(&line.product_id, list_price, line.quantity, precision)?;

                let unit_price = discounted(list_price, percentage, precision);
                priced.discount_percentage = percentage;
                priced.discount = round_money(list_price - unit_price, precision);
                priced.applied_discount = percentage_off(list_price, unit_price, precision);
                priced.original_unit_price = Some(unit_price);
                unit_price
            }
            None => match line.undiscounted_unit_price() {
                Some(price) => {
                    priced.discount = Decimal::ZERO;
                    priced.original_unit_price = Some(price);
                    round_money(price, precision)
                }
                None => {
                    priced.price_not_available = true;
                    priced.clear_money_fields();
                    return Ok(priced);
                }
            },
        };

        priced.unit_price = Some(unit_price);
        priced.total_price = line_amount(&line.product_id, unit_price, line.quantity, precision)?;
        Ok(priced)
    }
}

fn validate_inputs(
    products: &[CartItem],
    options: &CalculationOptions,
) -> Result<(), PricingError> {
    if let Some(line) = products.iter().find(|line| line.quantity <= Decimal::ZERO) {
        return Err(PricingError::invalid_input(format!(
            "quantity for product {} must be greater than zero, got {}",
            line.product_id, line.quantity
        )));
    }
    if options.pf_percentage < Decimal::ZERO || options.pf_percentage > Decimal::ONE_HUNDRED {
        return Err(PricingError::invalid_input(format!(
            "pf percentage must be within 0..=100, got {}",
            options.pf_percentage
        )));
    }
    if options.insurance_charges < Decimal::ZERO {
        return Err(PricingError::invalid_input("insurance charges cannot be negative"));
    }
    if options.insurance_charges > MAX_AMOUNT {
        return Err(PricingError::invalid_input(format!(
            "insurance charges must not exceed {MAX_AMOUNT}, got {}",
            options.insurance_charges
        )));
    }
    products.iter().try_for_each(validate_line_amounts)
}

/// Keeps every price, quantity and tax rate on a line (and its bundle
/// children) small enough that line arithmetic cannot overflow.
fn validate_line_amounts(line: &CartItem) -> Result<(), PricingError> {
    let product_id = &line.product_id;
    ensure_amount(product_id, "quantity", line.quantity)?;
    ensure_amount(product_id, "shipping charges", line.shipping_charges)?;
    let prices = [
        ("unit list price", line.unit_list_price),
        ("unit price", line.unit_price),
        ("original unit price", line.original_unit_price),
        ("base price", line.discount_source.as_ref().and_then(|source| source.base_price)),
        ("master price", line.discount_source.as_ref().and_then(|source| source.master_price)),
    ];
    for (field, price) in prices {
        if let Some(price) = price {
            ensure_amount(product_id, field, price)?;
        }
    }

    let rules = line.hsn_details.iter().flat_map(|hsn| [&hsn.inter_tax, &hsn.intra_tax]);
    for component in rules.flatten().flat_map(|rule| &rule.tax_req_ls) {
        if component.rate < Decimal::ZERO || component.rate > Decimal::ONE_HUNDRED {
            return Err(PricingError::invalid_input(format!(
                "{} rate for product {product_id} must be within 0..=100, got {}",
                component.tax_name, component.rate
            )));
        }
    }

    line.bundle_products.iter().try_for_each(validate_line_amounts)
}

fn is_priced(line: &CartItem) -> bool {
    line.unit_price.is_some() && !line.price_not_available
}

/// Takes the line's cash discount off its current (post-volume) unit price.
/// The snapshot keeps the basic-stage price so a later run starts from it.
fn apply_cash_discount(line: &CartItem, precision: u32) -> Result<CartItem, PricingError> {
    let Some(pre_cash) = line.unit_price.filter(|_| !line.cash_discount_value.is_zero()) else {
        return Ok(line.clone());
    };
    validate_percentage(&line.product_id, line.cash_discount_value)?;

    let mut updated = line.clone();
    let unit_price = discounted(pre_cash, line.cash_discount_value, precision);
    updated.unit_price = Some(unit_price);
    updated.total_price = line_amount(&line.product_id, unit_price, line.quantity, precision)?;
    if let Some(list_price) = line.list_price() {
        updated.discount = round_money(list_price - unit_price, precision);
        updated.applied_discount = percentage_off(list_price, unit_price, precision);
    }
    Ok(updated)
}

fn collect_warnings(products: &[CartItem], context: TaxContext) -> Vec<CalculationWarning> {
    let mut warnings = Vec::new();
    for line in products {
        if !is_priced(line) {
            warn!(
                event_name = "pricing.line.price_unavailable",
                product_id = %line.product_id,
                "line excluded from totals"
            );
            warnings.push(CalculationWarning {
                code: WarningCode::PriceNotAvailable,
                product_id: line.product_id.clone(),
                message: format!("Price is not available for product {}", line.product_id),
            });
        } else if !context.tax_exemption
            && applicable_rule(line.hsn_details.as_ref(), context).is_none()
        {
            warn!(
                event_name = "pricing.line.tax_rule_missing",
                product_id = %line.product_id,
                is_inter = context.is_inter,
                "line priced without tax"
            );
            warnings.push(CalculationWarning {
                code: WarningCode::TaxRuleMissing,
                product_id: line.product_id.clone(),
                message: format!("No tax rule found for product {}", line.product_id),
            });
        }

        if line.is_out_of_stock() {
            warnings.push(CalculationWarning {
                code: WarningCode::OutOfStock,
                product_id: line.product_id.clone(),
                message: format!("Product {} is out of stock", line.product_id),
            });
        }
    }
    warnings
}

fn aggregate(
    products: &[CartItem],
    settings: &CalculationSettings,
    options: &CalculationOptions,
) -> CartValue {
    let precision = settings.precision;
    let mut cart_value = CartValue::default();

    for line in products.iter().filter(|line| is_priced(line)) {
        cart_value.total_items += 1;
        cart_value.total_value += line.total_price;
        cart_value.total_discount += round_money(line.discount * line.quantity, precision);
        cart_value.taxable_amount += line.taxable_amount;
        cart_value.total_tax += line.total_tax;
        cart_value.total_shipping += line.shipping_charges;
        for (name, amount) in &line.tax_breakup {
            *cart_value.tax_totals.entry(name.clone()).or_insert(Decimal::ZERO) += *amount;
        }
    }

    cart_value.pf_rate =
        round_money(percent_of(cart_value.taxable_amount, options.pf_percentage), precision);
    cart_value.insurance_charges = round_money(options.insurance_charges, precision);
    cart_value.calculated_total = cart_value.taxable_amount
        + cart_value.total_tax
        + cart_value.total_shipping
        + cart_value.pf_rate
        + cart_value.insurance_charges;

    if settings.rounding_adjustment {
        cart_value.grand_total =
            round_money(cart_value.calculated_total, settings.grand_total_precision);
        cart_value.rounding_adjustment = cart_value.grand_total - cart_value.calculated_total;
    } else {
        cart_value.grand_total = cart_value.calculated_total;
        cart_value.rounding_adjustment = Decimal::ZERO;
    }

    cart_value
}
