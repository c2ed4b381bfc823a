//! Cent-precision money
//!
//! Amounts are integer cents in an `i64`; ledger arithmetic and every
//! threshold comparison happen on that integer, so binary floating point
//! never touches a balance. Parsing accepts `.` or `,` as the decimal
//! separator and refuses malformed input outright rather than coercing it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// A currency amount held as a signed number of cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Amount from a raw cent count
    ///
    /// # Examples
    /// ```
    /// use envelope_ledger::models::Money;
    /// let amount = Money::from_cents(1050); // €10.50
    /// ```
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Amount from whole currency units plus cents
    pub const fn from_units(units: i64, cents: i64) -> Self {
        Self(units * 100 + cents)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    /// The raw cent count
    pub const fn cents(&self) -> i64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// `percent` percent of this amount, rounded half away from zero to the
    /// nearest cent
    pub fn percent_of(&self, percent: u8) -> Self {
        let numerator = self.0 as i128 * percent as i128;
        let half = if numerator < 0 { -50 } else { 50 };
        Self(((numerator + half) / 100) as i64)
    }

    /// Parse user input into an amount
    ///
    /// Understands "10", "10.50", "10,50", a leading sign, and a `€`/`$`
    /// symbol on either side. At most one decimal separator with one or two
    /// digits after it; anything else is an error, never a silent zero.
    pub fn parse(input: &str) -> Result<Self, MoneyParseError> {
        let malformed = || MoneyParseError::InvalidFormat(input.to_string());

        let mut body = input.trim();
        let negative = if let Some(rest) = body.strip_prefix('-') {
            body = rest;
            true
        } else {
            false
        };
        let body = body
            .trim_start_matches(['€', '$'])
            .trim_end_matches(['€', '$'])
            .trim();
        if body.is_empty() || body.matches(['.', ',']).count() > 1 {
            return Err(malformed());
        }

        let magnitude = match body.split_once(['.', ',']) {
            None => 100 * body.parse::<i64>().map_err(|_| malformed())?,
            Some((whole, frac)) => {
                let units: i64 = if whole.is_empty() {
                    0
                } else {
                    whole.parse().map_err(|_| malformed())?
                };
                let sub_unit: i64 = match frac.len() {
                    1 => 10 * frac.parse::<i64>().map_err(|_| malformed())?,
                    2 => frac.parse().map_err(|_| malformed())?,
                    _ => return Err(malformed()),
                };
                units * 100 + sub_unit
            }
        };

        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{sign}€{}.{:02}",
            (self.0 / 100).abs(),
            (self.0 % 100).abs()
        )
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        Money(iter.map(|m| m.0).sum())
    }
}

/// Error raised for input `parse` cannot read as an amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    InvalidFormat(String),
}

impl fmt::Display for MoneyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let MoneyParseError::InvalidFormat(input) = self;
        write!(f, "not a valid amount: {input:?}")
    }
}

impl std::error::Error for MoneyParseError {}
