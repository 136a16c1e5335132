//! # Domain Types
//!
//! Entities and input shapes used throughout Tillbook.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌─────────────────┐  owns  ┌─────────────────┐  weak  ┌─────────────┐  │
//! │  │      Sale       │───────►│    SaleItem     │───────►│   Product   │  │
//! │  │  sale_number    │        │  quantity       │        │   stock     │  │
//! │  │  payment_status │        │  line_total     │        └──────┬──────┘  │
//! │  │  total_cents    │        └─────────────────┘               │ log     │
//! │  └───────┬─────────┘                                   ┌──────▼──────┐  │
//! │          │ weak                                        │ProductHistory│ │
//! │  ┌───────▼─────────┐  log   ┌─────────────────┐        │ (append-only)│ │
//! │  │  CashAccount    │───────►│  CashMovement   │        └─────────────┘  │
//! │  │ current_balance │        │ (append-only)   │                         │
//! │  └─────────────────┘        └─────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monetary columns are minor units (`*_cents`), percentages are basis
//! points (`*_bps`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::status::PaymentStatus;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points. 1800 bps = 18%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Converts a UI percentage (e.g. `18.0`) to basis points.
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Percentage for display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Discounts
// =============================================================================

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `value` is basis points of the base amount.
    Percentage,
    /// `value` is minor units.
    #[default]
    Amount,
}

/// A discount as entered on the form, before it is resolved to an amount.
///
/// Used both sale-wide and per line. The resolved amount is what gets
/// persisted on a [`SaleItem`]; the sale row keeps both the raw value and
/// the resolved amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub discount_type: DiscountType,
    pub value: i64,
}

impl Discount {
    pub const fn none() -> Self {
        Discount {
            discount_type: DiscountType::Amount,
            value: 0,
        }
    }

    pub const fn amount(cents: i64) -> Self {
        Discount {
            discount_type: DiscountType::Amount,
            value: cents,
        }
    }

    pub const fn percentage(bps: u32) -> Self {
        Discount {
            discount_type: DiscountType::Percentage,
            value: bps as i64,
        }
    }

    /// Resolves the discount against `base` to an absolute amount.
    ///
    /// ```rust
    /// use tillbook_core::{Discount, Money};
    ///
    /// let base = Money::from_cents(20_000);
    /// assert_eq!(Discount::percentage(1000).resolve(base).cents(), 2_000);
    /// assert_eq!(Discount::amount(500).resolve(base).cents(), 500);
    /// ```
    pub fn resolve(&self, base: Money) -> Money {
        match self.discount_type {
            DiscountType::Percentage => base.portion_bps(self.value.clamp(0, u32::MAX as i64) as u32),
            DiscountType::Amount => Money::from_cents(self.value),
        }
    }
}

// =============================================================================
// Sale Source
// =============================================================================

/// Channel a sale came in through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleSource {
    #[default]
    Pos,
    WalkIn,
    Phone,
    Whatsapp,
    Online,
    Other,
}

// =============================================================================
// Product
// =============================================================================

/// A product whose stock the engine keeps.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub branch_id: String,
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    pub cost_cents: i64,
    /// Quantity on hand. Only the stock helper in tillbook-db writes this.
    pub stock: i64,
    /// Oversell policy: when false, a sale may not take stock below zero.
    pub allow_negative_stock: bool,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Whether `quantity` units can leave stock under this product's policy.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.allow_negative_stock || self.stock >= quantity
    }
}

// =============================================================================
// Cash Account
// =============================================================================

/// A till, bank or mobile-money account that receives sale payments.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CashAccount {
    pub id: String,
    pub branch_id: String,
    pub name: String,
    pub current_balance_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CashAccount {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.current_balance_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A persisted sale (without its items, see [`SaleDetail`]).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    /// `SAL-<year>-<counter>`, unique.
    pub sale_number: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub source: SaleSource,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub subtotal_cents: i64,
    /// Discount as entered (bps or cents depending on `discount_type`).
    pub discount_value: i64,
    pub discount_type: DiscountType,
    /// Discount resolved to an amount.
    pub discount_cents: i64,
    pub tax_rate_bps: u32,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub balance_cents: i64,
    pub payment_status: PaymentStatus,
    pub cash_account_id: Option<String>,
    pub branch_id: String,
    pub user_id: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    #[inline]
    pub fn discount(&self) -> Discount {
        Discount {
            discount_type: self.discount_type,
            value: self.discount_value,
        }
    }

    /// Whether this sale currently holds stock and cash.
    #[inline]
    pub fn is_committed(&self) -> bool {
        self.payment_status.is_committed()
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line on a sale. Recreated wholesale on every edit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    /// None for custom, ad-hoc lines.
    pub product_id: Option<String>,
    pub product_name: String,
    pub sku: Option<String>,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub selling_price_cents: i64,
    /// Absolute discount on the line.
    pub discount_cents: i64,
    /// `selling_price × quantity − discount`.
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A sale with its items, as returned by every engine operation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

impl SaleDetail {
    /// Units per product this sale would take out of stock when committed.
    pub fn product_quantities(&self) -> impl Iterator<Item = (&str, i64)> {
        self.items
            .iter()
            .filter_map(|item| item.product_id.as_deref().map(|id| (id, item.quantity)))
    }
}

// =============================================================================
// Audit Ledger
// =============================================================================

/// Why a product's stock or pricing changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryType {
    Created,
    Sale,
    ReturnIn,
    Restock,
    Adjustment,
    PriceChange,
    CostChange,
    StockTake,
    TransferIn,
    TransferOut,
}

/// What kind of record a ledger entry points back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    Sale,
    SaleUpdate,
    SaleDeleted,
    Manual,
}

/// One immutable row of product history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductHistory {
    pub id: String,
    pub product_id: String,
    pub user_id: String,
    pub history_type: HistoryType,
    pub quantity_change: i64,
    pub old_stock: i64,
    pub new_stock: i64,
    pub old_price_cents: Option<i64>,
    pub new_price_cents: Option<i64>,
    pub old_cost_cents: Option<i64>,
    pub new_cost_cents: Option<i64>,
    pub reference_id: Option<String>,
    pub reference_type: Option<ReferenceType>,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One immutable row of cash-account history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CashMovement {
    pub id: String,
    pub cash_account_id: String,
    pub user_id: String,
    /// Signed: positive credits, negative debits.
    pub amount_cents: i64,
    pub old_balance_cents: i64,
    pub new_balance_cents: i64,
    pub reference_id: Option<String>,
    pub reference_type: Option<ReferenceType>,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inputs
// =============================================================================

/// Who bought. Either a stored customer or free text for walk-ins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerRef {
    pub id: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// One line of a sale form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemInput {
    #[serde(default)]
    pub product_id: Option<String>,
    pub product_name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub unit_cost_cents: i64,
    pub selling_price_cents: i64,
    #[serde(default)]
    pub discount: Discount,
}

impl SaleItemInput {
    /// Gross line amount before the line discount.
    #[inline]
    pub fn gross(&self) -> Money {
        Money::from_cents(self.selling_price_cents).multiply_quantity(self.quantity)
    }

    /// The line discount as an absolute amount.
    #[inline]
    pub fn resolved_discount(&self) -> Money {
        self.discount.resolve(self.gross())
    }
}

/// Input for creating or editing a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleInput {
    #[serde(default)]
    pub customer: CustomerRef,
    #[serde(default)]
    pub source: SaleSource,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<DateTime<Utc>>,
    pub items: Vec<SaleItemInput>,
    #[serde(default)]
    pub discount: Discount,
    #[serde(default)]
    pub tax_rate_bps: u32,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub amount_paid_cents: i64,
    #[serde(default)]
    pub cash_account_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SaleInput {
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_percentage() {
        let rate = TaxRate::from_percentage(18.0);
        assert_eq!(rate.bps(), 1800);
        assert!((rate.percentage() - 18.0).abs() < 0.001);
    }

    #[test]
    fn test_discount_resolve() {
        let base = Money::from_cents(12_345);
        assert_eq!(Discount::none().resolve(base), Money::zero());
        assert_eq!(Discount::amount(345).resolve(base).cents(), 345);
        // 10% of 123.45 = 12.345 -> 12.35
        assert_eq!(Discount::percentage(1000).resolve(base).cents(), 1_235);
    }

    #[test]
    fn test_product_can_sell() {
        let now = Utc::now();
        let mut product = Product {
            id: "p1".to_string(),
            branch_id: "b1".to_string(),
            sku: "RICE-5KG".to_string(),
            name: "Rice 5kg".to_string(),
            price_cents: 10_000,
            cost_cents: 7_000,
            stock: 2,
            allow_negative_stock: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(product.can_sell(2));
        assert!(!product.can_sell(3));

        product.allow_negative_stock = true;
        assert!(product.can_sell(3));
    }

    #[test]
    fn test_sale_input_deserializes_with_defaults() {
        let json = r#"{
            "items": [
                {"productName": "Rice 5kg", "quantity": 2, "sellingPriceCents": 10000}
            ],
            "taxRateBps": 1800,
            "paymentStatus": "QUOTE"
        }"#;

        let input: SaleInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.items.len(), 1);
        assert_eq!(input.items[0].discount, Discount::none());
        assert_eq!(input.payment_status, PaymentStatus::Quote);
        assert_eq!(input.source, SaleSource::Pos);
        assert_eq!(input.customer, CustomerRef::default());
        assert_eq!(input.items[0].gross().cents(), 20_000);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&HistoryType::ReturnIn).unwrap(),
            "\"RETURN_IN\""
        );
        assert_eq!(
            serde_json::to_string(&ReferenceType::SaleDeleted).unwrap(),
            "\"SALE_DELETED\""
        );
        assert_eq!(
            serde_json::to_string(&SaleSource::WalkIn).unwrap(),
            "\"WALK_IN\""
        );
    }
}
