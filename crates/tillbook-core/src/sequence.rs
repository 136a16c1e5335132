//! # Sale Numbers
//!
//! Format and parse `SAL-<year>-<counter>`.
//!
//! ```text
//! SAL-2026-007
//! ─┬─ ─┬── ─┬─
//!  │   │    └── counter, zero-padded to at least 3 digits (1000 stays 1000)
//!  │   └─────── calendar year, counter restarts at 1 each year
//!  └─────────── fixed prefix
//! ```
//!
//! Allocation itself needs the database and lives in tillbook-db.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

pub const SALE_NUMBER_PREFIX: &str = "SAL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SaleNumber {
    pub year: i32,
    pub counter: u32,
}

impl SaleNumber {
    pub const fn new(year: i32, counter: u32) -> Self {
        SaleNumber { year, counter }
    }

    /// The first number of a year.
    pub const fn first(year: i32) -> Self {
        SaleNumber { year, counter: 1 }
    }

    /// The number after this one, same year.
    pub const fn next(self) -> Self {
        SaleNumber {
            year: self.year,
            counter: self.counter + 1,
        }
    }

    /// `SAL-<year>-`, the prefix every number of that year starts with.
    ///
    /// ```rust
    /// use tillbook_core::sequence::SaleNumber;
    ///
    /// assert_eq!(SaleNumber::year_prefix(2026), "SAL-2026-");
    /// ```
    pub fn year_prefix(year: i32) -> String {
        format!("{}-{}-", SALE_NUMBER_PREFIX, year)
    }

    /// Parses a stored number.
    ///
    /// ```rust
    /// use tillbook_core::sequence::SaleNumber;
    ///
    /// let n = SaleNumber::parse("SAL-2026-042").unwrap();
    /// assert_eq!((n.year, n.counter), (2026, 42));
    /// assert!(SaleNumber::parse("INV-2026-042").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "saleNumber".to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.trim().splitn(3, '-');
        let (prefix, year, counter) = match (parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(y), Some(c)) => (p, y, c),
            _ => return Err(invalid("expected SAL-<year>-<counter>")),
        };

        if prefix != SALE_NUMBER_PREFIX {
            return Err(invalid("must start with SAL-"));
        }
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("year must be four digits"));
        }
        if counter.is_empty() || !counter.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("counter must be numeric"));
        }

        let year = year.parse().map_err(|_| invalid("year out of range"))?;
        let counter = counter.parse().map_err(|_| invalid("counter out of range"))?;

        Ok(SaleNumber { year, counter })
    }
}

impl fmt::Display for SaleNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{:03}", SALE_NUMBER_PREFIX, self.year, self.counter)
    }
}

impl FromStr for SaleNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SaleNumber::parse(s)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pads_to_three_digits() {
        assert_eq!(SaleNumber::first(2026).to_string(), "SAL-2026-001");
        assert_eq!(SaleNumber::new(2026, 42).to_string(), "SAL-2026-042");
        assert_eq!(SaleNumber::new(2026, 999).to_string(), "SAL-2026-999");
        assert_eq!(SaleNumber::new(2026, 1000).to_string(), "SAL-2026-1000");
    }

    #[test]
    fn test_next_stays_in_year() {
        let n = SaleNumber::new(2025, 999).next();
        assert_eq!(n.to_string(), "SAL-2025-1000");
    }

    #[test]
    fn test_parse_roundtrips_display() {
        for counter in [1, 9, 10, 999, 1000, 12345] {
            let n = SaleNumber::new(2026, counter);
            assert_eq!(SaleNumber::parse(&n.to_string()).unwrap(), n);
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "SAL", "SAL-2026", "SAL-26-001", "SAL-2026-", "SAL-2026-0a1", "sal-2026-001"] {
            assert!(SaleNumber::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_ordering_by_year_then_counter() {
        assert!(SaleNumber::new(2025, 500) < SaleNumber::new(2026, 1));
        assert!(SaleNumber::new(2026, 9) < SaleNumber::new(2026, 10));
    }
}
