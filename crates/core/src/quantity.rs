//! Decimal stock quantity and money value objects.
//!
//! Produce is sold by weight as often as by piece, so stock is decimal, not
//! integral. Both types are non-negative by construction; subtraction floors
//! at zero because that is the ledger's clamp policy, not an error.

use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entity::ValueObject;
use crate::error::{DomainError, DomainResult};

/// Non-negative decimal quantity of stock (kilograms, crates, dozens...).
///
/// Deserialization runs the same validation as [`Quantity::new`], so a
/// negative magnitude cannot enter through a request body either.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    /// Build a quantity, rejecting negative magnitudes.
    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "quantity cannot be negative: {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Whole-number convenience constructor.
    pub fn from_units(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// `max(0, self - other)`: the clamp-at-zero subtraction the ledger uses
    /// for `out` and `released` changes.
    pub fn saturating_sub(self, other: Quantity) -> Quantity {
        Quantity((self.0 - other.0).max(Decimal::ZERO))
    }

    /// Signed difference, for availability math where the result may be
    /// negative (reserved can exceed current after out-clamps).
    pub fn signed_sub(self, other: Quantity) -> Decimal {
        self.0 - other.0
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl ValueObject for Quantity {}

/// Non-negative monetary amount (unit prices, line totals, order totals).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Build an amount, rejecting negative values.
    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "amount cannot be negative: {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Whole-number convenience constructor.
    pub fn from_units(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Line total: `unit price × quantity`.
    pub fn times(self, quantity: Quantity) -> Money {
        Money(self.0 * quantity.value())
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl ValueObject for Money {}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(n: i64) -> Quantity {
        Quantity::new(Decimal::from(n)).unwrap()
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let err = Quantity::new(Decimal::from(-1)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        assert_eq!(qty(3).saturating_sub(qty(7)), Quantity::ZERO);
        assert_eq!(qty(7).saturating_sub(qty(3)), qty(4));
    }

    #[test]
    fn signed_sub_can_go_negative() {
        assert_eq!(qty(3).signed_sub(qty(7)), Decimal::from(-4));
    }

    #[test]
    fn money_times_quantity_is_the_line_total() {
        let price = Money::new(Decimal::new(250, 2)).unwrap(); // 2.50
        let total = price.times(qty(4));
        assert_eq!(total.value(), Decimal::new(1000, 2)); // 10.00
    }

    #[test]
    fn deserialization_rejects_negative_magnitudes() {
        let err = serde_json::from_str::<Quantity>("\"-2.5\"").unwrap_err();
        assert!(err.to_string().contains("negative"));

        let quantity: Quantity = serde_json::from_str("\"2.5\"").unwrap();
        assert_eq!(quantity.value(), Decimal::new(25, 1));
    }
}
