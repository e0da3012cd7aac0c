use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use pricebook_cli::commands::{calculate, config, validate};
use pricebook_core::QuantityRules;
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;

const SINGLE_SELLER_REQUEST: &str = r#"{
    "isInter": true,
    "taxExemption": false,
    "products": [{
        "productId": 1,
        "quantity": 2,
        "unitListPrice": 100,
        "disc_prd_related_obj": {"discounts": [{"min_qty": 1, "max_qty": 10, "Value": 10}]},
        "hsnDetails": {"interTax": {"taxReqLs": [{"taxName": "IGST", "rate": 18, "compound": false}]}}
    }]
}"#;

#[test]
fn calculate_returns_priced_cart() {
    with_env(&[], || {
        let (_dir, path) = write_request(SINGLE_SELLER_REQUEST);
        let result = calculate::run(&path, false);
        assert_eq!(result.exit_code, 0, "expected successful calculation");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "calculate");
        assert_eq!(payload["status"], "ok");

        let cart_value = &payload["data"]["cartValue"];
        assert_eq!(decimal(&cart_value["calculatedTotal"]), Decimal::new(2124, 1));
        assert_eq!(decimal(&cart_value["grandTotal"]), Decimal::from(212));
        assert_eq!(decimal(&cart_value["roundingAdjustment"]), Decimal::new(-4, 1));
        assert_eq!(decimal(&cart_value["taxTotals"]["IGST"]), Decimal::new(324, 1));
        assert_eq!(decimal(&payload["data"]["products"][0]["unitPrice"]), Decimal::from(90));
    });
}

#[test]
fn calculate_honors_rounding_env_override() {
    with_env(&[("PRICEBOOK_ROUNDING_ADJUSTMENT", "false")], || {
        let (_dir, path) = write_request(SINGLE_SELLER_REQUEST);
        let result = calculate::run(&path, false);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(decimal(&payload["data"]["cartValue"]["grandTotal"]), Decimal::new(2124, 1));
    });
}

#[test]
fn calculate_splits_carts_by_seller() {
    with_env(&[], || {
        let (_dir, path) = write_request(
            r#"{
                "taxExemption": true,
                "products": [
                    {"productId": "a", "sellerId": "s-1", "quantity": 1, "unitListPrice": 10},
                    {"productId": "b", "quantity": 3, "unitListPrice": 5},
                    {"productId": "c", "sellerId": "s-1", "quantity": 2, "unitListPrice": 7}
                ]
            }"#,
        );
        let result = calculate::run(&path, true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let data = &payload["data"];
        assert_eq!(decimal(&data["s-1"]["cartValue"]["grandTotal"]), Decimal::from(24));
        assert_eq!(decimal(&data["unassigned"]["cartValue"]["grandTotal"]), Decimal::from(15));
        assert_eq!(data["s-1"]["metadata"]["totalProducts"], 2);
    });
}

#[test]
fn calculate_reports_price_gaps_as_warnings() {
    with_env(&[], || {
        let (_dir, path) = write_request(
            r#"{
                "taxExemption": true,
                "products": [
                    {"productId": "a", "quantity": 1, "unitListPrice": 10},
                    {"productId": "b", "quantity": 1, "priceNotAvailable": true}
                ]
            }"#,
        );
        let result = calculate::run(&path, false);
        assert_eq!(result.exit_code, 0, "pricing gaps must not fail the calculation");

        let payload = parse_payload(&result.output);
        let warnings = payload["data"]["warnings"].as_array().cloned().unwrap_or_default();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0]["code"], "PRICE_NOT_AVAILABLE");
        assert_eq!(warnings[0]["productId"], "b");
    });
}

#[test]
fn calculate_rejects_non_positive_quantity() {
    with_env(&[], || {
        let (_dir, path) = write_request(
            r#"{"products": [{"productId": "a", "quantity": 0, "unitListPrice": 10}]}"#,
        );
        let result = calculate::run(&path, false);
        assert_eq!(result.exit_code, 4, "expected invalid input exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

#[test]
fn calculate_reports_unreadable_and_malformed_input() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let missing = calculate::run(&dir.path().join("missing.json"), false);
        assert_eq!(missing.exit_code, 3);
        let payload = parse_payload(&missing.output);
        assert_eq!(payload["error_class"], "input");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.starts_with("bad request: could not read"), "got {message}");

        let (_dir, path) = write_request("{not json");
        let malformed = calculate::run(&path, false);
        assert_eq!(malformed.exit_code, 3);
    });
}

#[test]
fn calculate_returns_config_failure_for_invalid_precision() {
    with_env(&[("PRICEBOOK_PRECISION", "9")], || {
        let (_dir, path) = write_request(SINGLE_SELLER_REQUEST);
        let result = calculate::run(&path, false);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.starts_with("internal error:"), "got {message}");
        assert!(message.contains("precision"), "got {message}");
    });
}

#[test]
fn calculate_rejects_amounts_beyond_the_supported_range() {
    with_env(&[], || {
        let (_dir, path) = write_request(
            r#"{"products": [{"productId": "a", "quantity": 1e10, "unitListPrice": 1e20}]}"#,
        );
        let result = calculate::run(&path, false);
        assert_eq!(result.exit_code, 4, "oversized amounts must fail cleanly");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

#[test]
fn validate_quantity_reports_step_violation() {
    let rules = QuantityRules {
        min_order_quantity: Some(Decimal::from(10)),
        packaging_quantity: Some(Decimal::from(4)),
        max_order_quantity: None,
    };

    let ok = validate::run(Decimal::from(12), &rules);
    assert_eq!(ok.exit_code, 0);
    assert_eq!(parse_payload(&ok.output)["status"], "ok");

    let violation = validate::run(Decimal::from(14), &rules);
    assert_eq!(violation.exit_code, 1);
    let payload = parse_payload(&violation.output);
    assert_eq!(payload["error_class"], "quantity_violation");
    assert_eq!(payload["message"], "Quantity must be a multiple of 4");
}

#[test]
fn config_output_attributes_sources() {
    with_env(&[("PRICEBOOK_LOG_LEVEL", "debug")], || {
        let output = config::run();
        assert!(output.contains("- calculation.precision = 2 (source: default)"));
        assert!(output.contains("- logging.level = debug (source: env (PRICEBOOK_LOG_LEVEL))"));
    });
}

fn write_request(body: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("request.json");
    fs::write(&path, body).expect("request file");
    (dir, path)
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(raw) => raw.parse().expect("decimal string"),
        other => other.to_string().parse().expect("decimal number"),
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "PRICEBOOK_PRECISION",
        "PRICEBOOK_ROUNDING_ADJUSTMENT",
        "PRICEBOOK_ITEM_WISE_SHIPPING_TAX",
        "PRICEBOOK_GRAND_TOTAL_PRECISION",
        "PRICEBOOK_LOGGING_LEVEL",
        "PRICEBOOK_LOGGING_FORMAT",
        "PRICEBOOK_LOG_LEVEL",
        "PRICEBOOK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
