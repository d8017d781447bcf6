//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" a
/// value object, create a new one with the new values.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Minor units (cents) per whole currency unit.
const MINOR_PER_UNIT: i64 = 100;

/// An amount of money in minor currency units (cents).
///
/// Arithmetic is integer-only; scaling uses exact rational math with
/// round-half-up.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub fn from_units(units: i64) -> Self {
        Self(units * MINOR_PER_UNIT)
    }

    /// Parse a user-supplied price such as `"42"` or `"42.50"`.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let input = input.trim();
        let invalid = || DomainError::validation(format!("'{input}' is not a valid price"));

        let (units, cents) = match input.split_once('.') {
            Some((u, c)) if !c.is_empty() && c.len() <= 2 => (u, c),
            Some(_) => return Err(invalid()),
            None => (input, "0"),
        };
        if units.is_empty() || !units.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !cents.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: i64 = units.parse().map_err(|_| invalid())?;
        let mut cents: i64 = cents.parse().map_err(|_| invalid())?;
        if input.split_once('.').is_some_and(|(_, c)| c.len() == 1) {
            cents *= 10;
        }
        Ok(Self(units * MINOR_PER_UNIT + cents))
    }

    pub fn minor(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// `self * numer / denom`, rounded half-up to the nearest minor unit.
    pub fn scale(&self, numer: i64, denom: i64) -> Money {
        Money(div_round_half_up(self.0 as i128 * numer as i128, denom as i128))
    }

    /// `self * numer / denom`, rounded half-up to the nearest whole unit.
    pub fn scale_to_unit(&self, numer: i64, denom: i64) -> Money {
        let units = div_round_half_up(
            self.0 as i128 * numer as i128,
            denom as i128 * MINOR_PER_UNIT as i128,
        );
        Money::from_units(units)
    }
}

fn div_round_half_up(numer: i128, denom: i128) -> i64 {
    if denom == 0 {
        return 0;
    }
    let (numer, denom) = if denom < 0 { (-numer, -denom) } else { (numer, denom) };
    let twice = numer * 2;
    let q = if numer >= 0 {
        (twice + denom) / (2 * denom)
    } else {
        -((-twice + denom - 1) / (2 * denom))
    };
    q as i64
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}{}.{:02}", abs / MINOR_PER_UNIT, abs % MINOR_PER_UNIT)
    }
}
