//! Custom test assertions
//!
//! Money-aware assertion helpers with more meaningful failure messages
//! than bare `assert_eq!`.

use core_kernel::Money;

/// Asserts that two Money values are equal, formatting both on failure
pub fn assert_money_eq(actual: &Money, expected: &Money) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    assert_eq!(
        actual.amount(),
        expected.amount(),
        "Money amounts differ: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {}", money);
}

/// Asserts that a Money value is strictly positive
pub fn assert_money_positive(money: &Money) {
    assert!(money.is_positive(), "Expected positive money, got {}", money);
}

/// Asserts that money values sum exactly to a total
pub fn assert_money_sums_to(parts: &[Money], total: &Money) {
    let sum = Money::sum(parts, total.currency()).expect("mixed currencies in parts");
    assert_eq!(
        sum.amount(),
        total.amount(),
        "Parts sum to {} but expected {}",
        sum,
        total
    );
}
