pub mod bundle;
pub mod calculator;
pub mod cash;
pub mod discount;
pub mod money;
pub mod quantity;
pub mod seller;
pub mod tax;
pub mod volume;

use serde::{Deserialize, Serialize};

use crate::domain::cart::CartItem;
use crate::domain::settings::{CalculationOptions, CalculationSettings, TaxContext};

/// A self-contained calculation job as exchanged with callers: the already
/// fetched cart lines plus jurisdiction, settings and options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    #[serde(default)]
    pub products: Vec<CartItem>,
    #[serde(flatten)]
    pub context: TaxContext,
    /// Overrides the configured settings when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<CalculationSettings>,
    #[serde(default)]
    pub options: CalculationOptions,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::CalculationRequest;
    use crate::domain::settings::{CalculationOptions, CalculationSettings};
    use crate::pricing::calculator::CartCalculator;

    #[test]
    fn request_document_drives_a_full_calculation() {
        let request: CalculationRequest = serde_json::from_str(
            r#"{
                "isInter": true,
                "taxExemption": false,
                "products": [{
                    "productId": 1,
                    "quantity": 2,
                    "unitListPrice": 100,
                    "disc_prd_related_obj": {"discounts": [{"min_qty": 1, "max_qty": 10, "Value": 10}]},
                    "hsnDetails": {"interTax": {"taxReqLs": [{"taxName": "IGST", "rate": 18, "compound": false}]}}
                }]
            }"#,
        )
        .expect("request document");

        assert!(request.context.is_inter);
        assert_eq!(request.options, CalculationOptions::default());
        let settings =
            CalculationSettings { rounding_adjustment: false, ..CalculationSettings::default() };
        let result = CartCalculator::default()
            .calculate(&request.products, request.context, &settings, &request.options)
            .expect("calculates");

        assert_eq!(result.products[0].unit_price, Some(Decimal::from(90)));
        assert_eq!(result.cart_value.total_value, Decimal::from(180));
        assert_eq!(result.cart_value.total_tax, Decimal::new(324, 1));
        assert_eq!(result.cart_value.grand_total, Decimal::new(2124, 1));
    }
}
