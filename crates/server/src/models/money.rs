//! Bounds for monetary amounts.
//!
//! Totals and prices are stored as `NUMERIC(12, 2)`, so every amount that
//! reaches a store must fit that column exactly.

use rust_decimal::Decimal;
use thiserror::Error;

/// Decimal places kept by the money columns.
pub const MONEY_SCALE: u32 = 2;

/// Exclusive upper bound of a `NUMERIC(12, 2)` value (10^10).
pub const MONEY_LIMIT: Decimal = Decimal::from_parts(0x540B_E400, 2, 0, false, 0);

/// Why an amount cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("cannot be negative")]
    Negative,
    #[error("cannot have more than {MONEY_SCALE} decimal places")]
    TooPrecise,
    #[error("must be less than {MONEY_LIMIT}")]
    TooLarge,
}

/// Check that `amount` is a storable, non-negative money value.
///
/// # Errors
///
/// Returns the first bound `amount` violates.
pub fn check_amount(amount: Decimal) -> Result<(), AmountError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative);
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(AmountError::TooPrecise);
    }
    if amount >= MONEY_LIMIT {
        return Err(AmountError::TooLarge);
    }
    Ok(())
}
