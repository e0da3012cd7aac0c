use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cart::CartItem;
use crate::domain::product::ProductId;

/// Order-quantity constraints of a product.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuantityRules {
    pub min_order_quantity: Option<Decimal>,
    pub packaging_quantity: Option<Decimal>,
    pub max_order_quantity: Option<Decimal>,
}

impl QuantityRules {
    pub fn for_item(item: &CartItem) -> Self {
        Self {
            min_order_quantity: item.min_order_quantity,
            packaging_quantity: item.packaging_quantity,
            max_order_quantity: item.max_order_quantity,
        }
    }

    /// Checks `quantity` against the rules and describes the first violation.
    pub fn validate(&self, quantity: Decimal) -> Result<(), String> {
        if quantity <= Decimal::ZERO {
            return Err("Quantity must be greater than zero".to_string());
        }

        if let Some(minimum) = self.min_order_quantity.filter(|min| *min > Decimal::ZERO) {
            if quantity < minimum {
                return Err(format!("Minimum order quantity is {}", minimum.normalize()));
            }
        }

        if let Some(maximum) = self.max_order_quantity.filter(|max| *max > Decimal::ZERO) {
            if quantity > maximum {
                return Err(format!("Maximum order quantity is {}", maximum.normalize()));
            }
        }

        if let Some(step) = self.packaging_quantity.filter(|step| *step > Decimal::ZERO) {
            if !(quantity % step).is_zero() {
                return Err(format!("Quantity must be a multiple of {}", step.normalize()));
            }
        }

        Ok(())
    }
}

/// Caller-side pre-check; the pricing pipeline itself does not enforce it.
pub fn validate_quantity(item: &CartItem) -> Result<(), String> {
    QuantityRules::for_item(item).validate(item.quantity)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityViolation {
    pub product_id: ProductId,
    pub message: String,
}

pub fn validate_cart_quantities(products: &[CartItem]) -> Vec<QuantityViolation> {
    products
        .iter()
        .filter_map(|item| {
            validate_quantity(item).err().map(|message| QuantityViolation {
                product_id: item.product_id.clone(),
                message,
            })
        })
        .collect()
}
