//! Non-negative currency amounts

use crate::error::SchemaError;
use serde::Serialize;

/// Non-negative, finite currency amount (rupees)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
#[serde(transparent)]
pub struct Amount(f64);

impl Amount {
    /// Zero rupees
    pub const ZERO: Amount = Amount(0.0);

    /// Validate a raw amount
    ///
    /// # Errors
    /// - `SchemaError::NonFiniteAmount` for NaN or infinity
    /// - `SchemaError::NegativeAmount` for values below zero
    pub fn new(value: f64, field: &'static str) -> Result<Self, SchemaError> {
        if !value.is_finite() {
            return Err(SchemaError::NonFiniteAmount { field });
        }
        if value < 0.0 {
            return Err(SchemaError::NegativeAmount { field, value });
        }
        // Normalise -0.0
        Ok(Self(value.abs()))
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether the amount is exactly zero
    #[inline]
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_accepts_zero_and_positive() {
        assert!(Amount::new(0.0, "x").unwrap().is_zero());
        assert_eq!(Amount::new(145_000.0, "x").unwrap().value(), 145_000.0);
    }

    #[test]
    fn amount_rejects_negative_and_nan() {
        assert!(matches!(
            Amount::new(-5.0, "x"),
            Err(SchemaError::NegativeAmount { .. })
        ));
        assert!(matches!(
            Amount::new(f64::NAN, "x"),
            Err(SchemaError::NonFiniteAmount { .. })
        ));
        assert!(matches!(
            Amount::new(f64::INFINITY, "x"),
            Err(SchemaError::NonFiniteAmount { .. })
        ));
    }

    #[test]
    fn negative_zero_is_normalised() {
        let amount = Amount::new(-0.0, "x").unwrap();
        assert!(amount.value().is_sign_positive());
    }
}
