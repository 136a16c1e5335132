//! # Line-Item Calculator
//!
//! Pure computation of line and sale totals.
//!
//! ## Order of Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per line:   line_total = price × qty − line_discount                   │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │  subtotal      = Σ line_total                                          │
//! │  discount      = PERCENTAGE ? subtotal × bps / 10000 : amount   ◄ round │
//! │  after_discount= subtotal − discount                                   │
//! │  tax           = after_discount × tax_bps / 10000               ◄ round │
//! │  total         = after_discount + tax                                  │
//! │  balance       = total − amount_paid                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line discounts arrive already resolved to amounts. Rounding happens at
//! exactly the two marked steps (half-up, see [`Money::portion_bps`]), so
//! `total == after_discount + tax` and `balance == total − amount_paid`
//! hold to the cent.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Discount, SaleInput, TaxRate};

/// What the calculator needs from one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    pub selling_price: Money,
    pub quantity: i64,
    /// Absolute amount.
    pub discount: Money,
}

impl LineInput {
    #[inline]
    pub fn line_total(&self) -> Money {
        self.selling_price.multiply_quantity(self.quantity) - self.discount
    }
}

/// Computed sale-level figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleTotals {
    pub subtotal: Money,
    /// Sale-level discount resolved to an amount.
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    pub amount_paid: Money,
    pub balance: Money,
}

impl SaleTotals {
    #[inline]
    pub fn after_discount(&self) -> Money {
        self.subtotal - self.discount
    }

    /// Re-derives the balance for a new paid amount without touching the
    /// other figures.
    pub fn with_amount_paid(self, amount_paid: Money) -> Self {
        SaleTotals {
            amount_paid,
            balance: self.total - amount_paid,
            ..self
        }
    }
}

/// Lines plus sale totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calculation {
    pub line_totals: Vec<Money>,
    pub totals: SaleTotals,
}

/// Runs the calculation over already-resolved lines.
///
/// ```rust
/// use tillbook_core::calculator::{calculate, LineInput};
/// use tillbook_core::{Discount, Money, TaxRate};
///
/// let lines = [LineInput {
///     selling_price: Money::from_cents(10_000),
///     quantity: 2,
///     discount: Money::zero(),
/// }];
/// let calc = calculate(&lines, Discount::none(), TaxRate::from_bps(1800), Money::from_cents(23_600));
///
/// assert_eq!(calc.totals.subtotal.cents(), 20_000);
/// assert_eq!(calc.totals.tax.cents(), 3_600);
/// assert_eq!(calc.totals.total.cents(), 23_600);
/// assert!(calc.totals.balance.is_zero());
/// ```
pub fn calculate(
    lines: &[LineInput],
    sale_discount: Discount,
    tax_rate: TaxRate,
    amount_paid: Money,
) -> Calculation {
    let line_totals: Vec<Money> = lines.iter().map(LineInput::line_total).collect();
    let subtotal: Money = line_totals.iter().copied().sum();

    let discount = sale_discount.resolve(subtotal);
    let after_discount = subtotal - discount;
    let tax = after_discount.calculate_tax(tax_rate);
    let total = after_discount + tax;

    Calculation {
        line_totals,
        totals: SaleTotals {
            subtotal,
            discount,
            tax,
            total,
            amount_paid,
            balance: total - amount_paid,
        },
    }
}

/// Resolves the line discounts of a sale form and runs [`calculate`].
pub fn calculate_input(input: &SaleInput) -> Calculation {
    let lines: Vec<LineInput> = input
        .items
        .iter()
        .map(|item| LineInput {
            selling_price: Money::from_cents(item.selling_price_cents),
            quantity: item.quantity,
            discount: item.resolved_discount(),
        })
        .collect();

    calculate(&lines, input.discount, input.tax_rate(), input.amount_paid())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::PaymentStatus;
    use crate::types::SaleItemInput;

    fn line(price: i64, qty: i64, discount: i64) -> LineInput {
        LineInput {
            selling_price: Money::from_cents(price),
            quantity: qty,
            discount: Money::from_cents(discount),
        }
    }

    #[test]
    fn test_single_line_with_tax() {
        let calc = calculate(
            &[line(10_000, 2, 0)],
            Discount::none(),
            TaxRate::from_bps(1800),
            Money::from_cents(23_600),
        );

        assert_eq!(calc.line_totals, vec![Money::from_cents(20_000)]);
        assert_eq!(calc.totals.subtotal.cents(), 20_000);
        assert_eq!(calc.totals.tax.cents(), 3_600);
        assert_eq!(calc.totals.total.cents(), 23_600);
        assert_eq!(calc.totals.balance.cents(), 0);
    }

    #[test]
    fn test_line_discounts_then_percentage_sale_discount() {
        let calc = calculate(
            &[line(1_500, 3, 500), line(2_000, 1, 0)],
            Discount::percentage(1000),
            TaxRate::from_bps(1600),
            Money::from_cents(1_000),
        );

        // 4000 + 2000
        assert_eq!(calc.totals.subtotal.cents(), 6_000);
        assert_eq!(calc.totals.discount.cents(), 600);
        assert_eq!(calc.totals.after_discount().cents(), 5_400);
        assert_eq!(calc.totals.tax.cents(), 864);
        assert_eq!(calc.totals.total.cents(), 6_264);
        assert_eq!(calc.totals.balance.cents(), 5_264);
    }

    #[test]
    fn test_amount_sale_discount() {
        let calc = calculate(
            &[line(999, 1, 0)],
            Discount::amount(99),
            TaxRate::zero(),
            Money::zero(),
        );
        assert_eq!(calc.totals.total.cents(), 900);
        assert_eq!(calc.totals.balance.cents(), 900);
    }

    #[test]
    fn test_total_invariant_holds_across_odd_rates() {
        let rates = [0, 1, 333, 825, 1250, 1800, 10_000];
        let discounts = [
            Discount::none(),
            Discount::amount(7),
            Discount::percentage(333),
            Discount::percentage(10_000),
        ];

        for &bps in &rates {
            for &discount in &discounts {
                let calc = calculate(
                    &[line(1_999, 3, 1), line(1, 7, 0)],
                    discount,
                    TaxRate::from_bps(bps),
                    Money::from_cents(123),
                );
                let t = calc.totals;
                assert_eq!(t.total, t.subtotal - t.discount + t.tax);
                assert_eq!(t.balance, t.total - t.amount_paid);
                assert_eq!(t.tax, t.after_discount().calculate_tax(TaxRate::from_bps(bps)));
            }
        }
    }

    #[test]
    fn test_overpayment_gives_negative_balance() {
        let calc = calculate(&[line(500, 1, 0)], Discount::none(), TaxRate::zero(), Money::from_cents(700));
        assert_eq!(calc.totals.balance.cents(), -200);
    }

    #[test]
    fn test_with_amount_paid_keeps_totals() {
        let calc = calculate(&[line(10_000, 2, 0)], Discount::none(), TaxRate::from_bps(1800), Money::zero());
        let paid = calc.totals.with_amount_paid(Money::from_cents(20_000));
        assert_eq!(paid.total.cents(), 23_600);
        assert_eq!(paid.balance.cents(), 3_600);
    }

    #[test]
    fn test_calculate_input_resolves_line_percentages() {
        let input = SaleInput {
            customer: Default::default(),
            source: Default::default(),
            date: None,
            items: vec![SaleItemInput {
                product_id: None,
                product_name: "Delivery".to_string(),
                sku: None,
                quantity: 4,
                unit_cost_cents: 0,
                selling_price_cents: 2_500,
                discount: Discount::percentage(2500),
            }],
            discount: Discount::none(),
            tax_rate_bps: 0,
            payment_status: PaymentStatus::Unpaid,
            amount_paid_cents: 0,
            cash_account_id: None,
            notes: None,
        };

        let calc = calculate_input(&input);
        assert_eq!(calc.line_totals, vec![Money::from_cents(7_500)]);
        assert_eq!(calc.totals.total.cents(), 7_500);
    }
}
