//! # Payment Status
//!
//! The payment status doubles as the sale's commitment state.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   (initial)                                                             │
//! │      │                                                                  │
//! │      ├──────────► QUOTE ───────────────┐   no stock, no cash            │
//! │      │              │  ▲               │                                │
//! │      │              │  └── QUOTE ──────┘   (edit a quote)               │
//! │      │              ▼                                                   │
//! │      └──────► ┌───────────────────────────────────┐                     │
//! │               │ PAID ⇄ UNPAID ⇄ PARTIAL ⇄ INSTALLMENT │ stock + cash    │
//! │               └───────────────────────────────────┘   committed         │
//! │                              │                                          │
//! │                              ✗ never back to QUOTE                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Create, update, delete and the status transition all ask
//! [`PaymentStatus::is_committed`] the same question, so the three call
//! sites cannot drift apart.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    Partial,
    Installment,
    /// Priced but not committed: no stock or cash has moved.
    Quote,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [
        PaymentStatus::Paid,
        PaymentStatus::Unpaid,
        PaymentStatus::Partial,
        PaymentStatus::Installment,
        PaymentStatus::Quote,
    ];

    /// True when a sale in this status holds stock (and its payment).
    #[inline]
    pub const fn is_committed(self) -> bool {
        !matches!(self, PaymentStatus::Quote)
    }

    /// Whether a sale may move from `self` to `next`.
    ///
    /// Everything is reachable except QUOTE from a committed status.
    #[inline]
    pub const fn can_transition_to(self, next: PaymentStatus) -> bool {
        !(self.is_committed() && !next.is_committed())
    }

    /// Like [`can_transition_to`](Self::can_transition_to), as an error.
    pub fn ensure_transition(self, next: PaymentStatus) -> CoreResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::InvalidStatusTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Whether moving from `self` to `next` is the moment stock gets taken.
    #[inline]
    pub const fn commits_on(self, next: PaymentStatus) -> bool {
        !self.is_committed() && next.is_committed()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Partial => "PARTIAL",
            PaymentStatus::Installment => "INSTALLMENT",
            PaymentStatus::Quote => "QUOTE",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "paymentStatus".to_string(),
                allowed: PaymentStatus::ALL
                    .iter()
                    .map(|status| status.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_quote_is_uncommitted() {
        for status in PaymentStatus::ALL {
            assert_eq!(status.is_committed(), status != PaymentStatus::Quote);
        }
    }

    #[test]
    fn test_quote_is_initial_only() {
        for from in PaymentStatus::ALL {
            for to in PaymentStatus::ALL {
                let allowed = from.ensure_transition(to).is_ok();
                let expected = from == PaymentStatus::Quote || to != PaymentStatus::Quote;
                assert_eq!(allowed, expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_commits_on() {
        assert!(PaymentStatus::Quote.commits_on(PaymentStatus::Paid));
        assert!(PaymentStatus::Quote.commits_on(PaymentStatus::Installment));
        assert!(!PaymentStatus::Quote.commits_on(PaymentStatus::Quote));
        assert!(!PaymentStatus::Paid.commits_on(PaymentStatus::Partial));
    }

    #[test]
    fn test_parse() {
        assert_eq!("paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert_eq!(" QUOTE ".parse::<PaymentStatus>().unwrap(), PaymentStatus::Quote);
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_rejected_transition_message() {
        let err = PaymentStatus::Paid
            .ensure_transition(PaymentStatus::Quote)
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot change payment status from PAID to QUOTE");
    }
}
