//! Field validators shared by every entity write path.
//!
//! These are pure functions: no connection, no clock, no side effects. Each
//! service-layer constructor or setter funnels a field through exactly one of
//! them before staging a row, and the entity `before_save` hooks re-run the
//! same checks as a second line of defense.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::ServiceError;

/// Deliberately loose: one `@`, one dot in the domain, no whitespace. The
/// mail provider is the authority on deliverability, not this crate.
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// Returns the trimmed value, or rejects empty/whitespace-only input.
pub fn validate_not_blank(value: &str, field: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation(field, "blank"));
    }
    Ok(trimmed.to_string())
}

/// Validates a surrogate or foreign key. Keys start at 1.
pub fn validate_id(value: i32, field: &str) -> Result<i32, ServiceError> {
    if value < 1 {
        return Err(ServiceError::validation(field, "non-positive"));
    }
    Ok(value)
}

/// Rejects values that are zero or below.
pub fn validate_positive(value: i64, field: &str) -> Result<i64, ServiceError> {
    if value <= 0 {
        return Err(ServiceError::validation(field, "non-positive"));
    }
    Ok(value)
}

/// Rejects values below zero. Zero is allowed (an out-of-stock product).
pub fn validate_non_negative(value: i64, field: &str) -> Result<i64, ServiceError> {
    if value < 0 {
        return Err(ServiceError::validation(field, "negative"));
    }
    Ok(value)
}

/// Returns the trimmed address, or rejects input that does not look like
/// `local@domain.tld`.
pub fn validate_email(value: &str) -> Result<String, ServiceError> {
    let trimmed = validate_not_blank(value, "email")?;
    if !EMAIL_PATTERN.is_match(&trimmed) {
        return Err(ServiceError::validation("email", "invalid-email"));
    }
    Ok(trimmed)
}

/// Converts a decimal dollar amount into integer minor units (cents).
///
/// Standard two-decimal rounding applies (half away from zero), so the
/// stored price is always an exact integer cent count. Non-positive amounts
/// are rejected here rather than at the storage layer.
pub fn dollars_to_cents(amount: Decimal) -> Result<i64, ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::validation("price", "non-positive"));
    }
    let cents = (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    cents
        .to_i64()
        .ok_or_else(|| ServiceError::validation("price", "wrong-type"))
}

/// The display-side inverse of [`dollars_to_cents`]. Conversion back to a
/// decimal form is the caller's concern; this helper only exists so callers
/// do not reimplement the scale.
pub fn cents_to_dollars(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn not_blank_trims() {
        assert_eq!(validate_not_blank("  Submariner  ", "name").unwrap(), "Submariner");
        assert_matches!(
            validate_not_blank("   ", "name"),
            Err(ServiceError::Validation { ref field, ref reason })
                if field == "name" && reason == "blank"
        );
        assert_matches!(validate_not_blank("", "name"), Err(ServiceError::Validation { .. }));
    }

    #[test]
    fn ids_start_at_one() {
        assert_eq!(validate_id(1, "product_id").unwrap(), 1);
        assert_matches!(validate_id(0, "product_id"), Err(ServiceError::Validation { .. }));
        assert_matches!(validate_id(-7, "category_id"), Err(ServiceError::Validation { .. }));
    }

    #[test]
    fn quantity_bounds() {
        assert_eq!(validate_positive(1, "quantity").unwrap(), 1);
        assert_matches!(validate_positive(0, "quantity"), Err(ServiceError::Validation { .. }));
        assert_eq!(validate_non_negative(0, "item_quantity").unwrap(), 0);
        assert_matches!(
            validate_non_negative(-1, "item_quantity"),
            Err(ServiceError::Validation { .. })
        );
    }

    #[test]
    fn email_shape() {
        assert_eq!(validate_email("kai@montluxe.com").unwrap(), "kai@montluxe.com");
        assert_matches!(validate_email("not-an-email"), Err(ServiceError::Validation { .. }));
        assert_matches!(validate_email("two@@montluxe.com"), Err(ServiceError::Validation { .. }));
        assert_matches!(validate_email("kai@montluxe"), Err(ServiceError::Validation { .. }));
    }

    #[rstest]
    #[case(dec!(12.34), 1234)]
    #[case(dec!(499.99), 49999)]
    #[case(dec!(0.01), 1)]
    #[case(dec!(1450.00), 145000)]
    // half-cent inputs round away from zero
    #[case(dec!(10.005), 1001)]
    fn dollars_convert_to_exact_cents(#[case] amount: Decimal, #[case] expected: i64) {
        assert_eq!(dollars_to_cents(amount).unwrap(), expected);
    }

    #[test]
    fn zero_and_negative_prices_are_rejected() {
        assert_matches!(
            dollars_to_cents(dec!(0.00)),
            Err(ServiceError::Validation { ref field, ref reason })
                if field == "price" && reason == "non-positive"
        );
        assert_matches!(dollars_to_cents(dec!(-5.00)), Err(ServiceError::Validation { .. }));
    }

    #[test]
    fn cents_round_trip_for_display() {
        assert_eq!(cents_to_dollars(1234), dec!(12.34));
        assert_eq!(cents_to_dollars(dollars_to_cents(dec!(779.00)).unwrap()), dec!(779.00));
    }
}
