//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::money::MoneyError;

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_core_error_not_found() {
    let error = CoreError::not_found("Invoice missing");

    match error {
        CoreError::NotFound(msg) => assert!(msg.contains("Invoice")),
        _ => panic!("Expected NotFound error"),
    }
}

#[test]
fn test_money_error_wraps_into_core_error() {
    let money_error = MoneyError::CurrencyMismatch("NZD".to_string(), "USD".to_string());
    let error: CoreError = money_error.into();

    assert!(matches!(error, CoreError::Money(_)));
    assert!(error.to_string().contains("NZD"));
}
