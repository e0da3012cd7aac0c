use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cart::{CartItem, HsnDetails, TaxComponent, TaxRule};
use crate::domain::settings::{CalculationSettings, TaxContext};
use crate::pricing::money::{percent_of, round_money};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxResolution {
    pub taxable_amount: Decimal,
    pub total_tax: Decimal,
    pub tax_breakup: BTreeMap<String, Decimal>,
}

impl TaxResolution {
    fn untaxed(amount: Decimal, precision: u32) -> Self {
        Self { taxable_amount: round_money(amount, precision), ..Self::default() }
    }

    /// Adds another resolution's tax into this one, keeping this taxable amount.
    pub fn absorb_tax(&mut self, other: &TaxResolution) {
        self.total_tax += other.total_tax;
        for (name, amount) in &other.tax_breakup {
            *self.tax_breakup.entry(name.clone()).or_insert(Decimal::ZERO) += *amount;
        }
    }
}

/// The tax rule that applies to a sale, `None` when exempt or unclassified.
pub fn applicable_rule(hsn: Option<&HsnDetails>, context: TaxContext) -> Option<&TaxRule> {
    if context.tax_exemption {
        return None;
    }
    hsn.and_then(|details| details.rule_for(context.is_inter))
}

/// Resolves tax on `amount` for one line.
///
/// Exclusive amounts are the taxable base and tax is added on top. Inclusive
/// amounts already contain the tax, which is backed out. Exempt sales and
/// lines without an applicable rule carry no tax.
pub fn resolve_tax(
    hsn: Option<&HsnDetails>,
    context: TaxContext,
    amount: Decimal,
    tax_inclusive: bool,
    precision: u32,
) -> TaxResolution {
    let Some(rule) = applicable_rule(hsn, context) else {
        return TaxResolution::untaxed(amount, precision);
    };
    if rule.tax_req_ls.is_empty() {
        return TaxResolution::untaxed(amount, precision);
    }

    if tax_inclusive {
        extract_inclusive(&rule.tax_req_ls, amount, precision)
    } else {
        apply_exclusive(&rule.tax_req_ls, amount, precision)
    }
}

/// Returns `line` with its tax fields resolved from its current total price.
///
/// With item-wise shipping tax the line's shipping is taxed exclusively with
/// the same components and merged into the line tax.
pub fn with_line_tax(
    line: &CartItem,
    context: TaxContext,
    settings: &CalculationSettings,
) -> CartItem {
    let mut resolution = resolve_tax(
        line.hsn_details.as_ref(),
        context,
        line.total_price,
        line.tax_inclusive,
        settings.precision,
    );
    if settings.item_wise_shipping_tax && !line.shipping_charges.is_zero() {
        let shipping_tax = resolve_tax(
            line.hsn_details.as_ref(),
            context,
            line.shipping_charges,
            false,
            settings.precision,
        );
        resolution.absorb_tax(&shipping_tax);
    }

    let mut taxed = line.clone();
    taxed.line_total = resolution.taxable_amount + resolution.total_tax + line.shipping_charges;
    taxed.taxable_amount = resolution.taxable_amount;
    taxed.total_tax = resolution.total_tax;
    taxed.tax_breakup = resolution.tax_breakup;
    taxed
}

/// Component amounts in input order. Non-compound taxes apply to the base;
/// compound taxes apply to the base plus the compound taxes before them.
fn component_amounts(components: &[TaxComponent], base: Decimal) -> Vec<(&str, Decimal)> {
    let mut compounded = Decimal::ZERO;
    components
        .iter()
        .map(|component| {
            let amount = if component.compound {
                let amount = percent_of(base + compounded, component.rate);
                compounded += amount;
                amount
            } else {
                percent_of(base, component.rate)
            };
            (component.tax_name.as_str(), amount)
        })
        .collect()
}

fn apply_exclusive(components: &[TaxComponent], amount: Decimal, precision: u32) -> TaxResolution {
    let taxable_amount = round_money(amount, precision);
    let mut resolution = TaxResolution { taxable_amount, ..TaxResolution::default() };

    for (name, value) in component_amounts(components, taxable_amount) {
        let value = round_money(value, precision);
        resolution.total_tax += value;
        *resolution.tax_breakup.entry(name.to_owned()).or_insert(Decimal::ZERO) += value;
    }

    resolution
}

fn extract_inclusive(
    components: &[TaxComponent],
    amount: Decimal,
    precision: u32,
) -> TaxResolution {
    let gross = round_money(amount, precision);
    let effective_rate: Decimal =
        component_amounts(components, Decimal::ONE).iter().map(|(_, value)| *value).sum();
    let base = gross / (Decimal::ONE + effective_rate);
    let total_tax = round_money(gross - base, precision);

    let mut tax_breakup = BTreeMap::new();
    let amounts = component_amounts(components, base);
    let mut allocated = Decimal::ZERO;
    let last_index = amounts.len().saturating_sub(1);
    for (index, (name, value)) in amounts.into_iter().enumerate() {
        let value =
            if index == last_index { total_tax - allocated } else { round_money(value, precision) };
        allocated += value;
        *tax_breakup.entry(name.to_owned()).or_insert(Decimal::ZERO) += value;
    }

    TaxResolution { taxable_amount: gross - total_tax, total_tax, tax_breakup }
}
