//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In a ledger that means a batch of ₹0.10 + ₹0.20 on one side and       │
//! │  ₹0.30 on the other is "unbalanced" - or worse, silently accepted.    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    10 + 20 = 30 paise, exactly, every time                             │
//! │    Decimal only appears at the API boundary (₹ amounts in, ₹ out)     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use khata_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! // From minor units (preferred internally)
//! let price = Money::from_minor(11800); // ₹118.00
//!
//! // From a caller-supplied rupee amount
//! let tax = Money::from_major(Decimal::new(1800, 2)).unwrap(); // ₹18.00
//!
//! let total = price + tax;
//! assert_eq!(total.minor(), 13600);
//! assert_eq!(total.to_major(), Decimal::new(13600, 2));
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::TaxRate;

/// Minor units per major unit (100 paise = ₹1).
pub const MINOR_PER_MAJOR: i64 = 100;

/// Decimal places kept for currency amounts.
pub const CURRENCY_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (paise for INR).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for balances and deltas
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  PostingLine.amount (₹ Decimal) ──► Money::from_major ──► EntryDraft   │
/// │                                                                         │
/// │  EntryDraft.debit / credit ──► ledger_entries.debit_minor / credit_minor│
/// │                                                                         │
/// │  SUM(entries) ──► JournalBatch.total_debit / total_credit               │
/// │                                                                         │
/// │  EVERY persisted monetary value in the ledger flows through this type  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units (paise).
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// let price = Money::from_minor(1099); // ₹10.99
    /// assert_eq!(price.minor(), 1099);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Converts a major-unit amount (rupees) into Money.
    ///
    /// Rounds half-away-from-zero at the second decimal place:
    /// `10.005 → 10.01`, `-10.005 → -10.01`, `10.004 → 10.00`.
    ///
    /// ## Errors
    /// `CoreError::AmountOutOfRange` if the value does not fit in i64 paise.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let m = Money::from_major(Decimal::new(10005, 3)).unwrap(); // 10.005
    /// assert_eq!(m.minor(), 1001);
    /// ```
    pub fn from_major(amount: Decimal) -> CoreResult<Self> {
        let rounded =
            amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);

        rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|scaled| scaled.to_i64())
            .map(Money)
            .ok_or_else(|| CoreError::AmountOutOfRange(amount.to_string()))
    }

    /// Like [`Money::from_major`], but a missing amount is zero.
    ///
    /// Collaborators frequently hand over optional totals (e.g. an order
    /// without a tax component); absent means nothing, not an error.
    pub fn from_major_opt(amount: Option<Decimal>) -> CoreResult<Self> {
        match amount {
            Some(value) => Money::from_major(value),
            None => Ok(Money::zero()),
        }
    }

    /// Returns the amount in major units with exactly two decimal places.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Money::from_minor(11800).to_major().to_string(), "118.00");
    /// assert_eq!(Money::from_minor(11800).to_major(), Decimal::new(118, 0));
    /// ```
    #[inline]
    pub fn to_major(&self) -> Decimal {
        Decimal::new(self.0, CURRENCY_SCALE)
    }

    /// Parses user-facing text such as `"₹1,180.50"` or `"  42 "`.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let cleaned: String = text
            .chars()
            .filter(|c| !matches!(c, '₹' | ',') && !c.is_whitespace())
            .collect();

        if cleaned.is_empty() {
            return Err(ValidationError::Required {
                field: "amount".to_string(),
            }
            .into());
        }

        let value = Decimal::from_str(&cleaned).map_err(|e| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: e.to_string(),
        })?;

        Money::from_major(value)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (rupee) portion, truncated toward zero.
    #[inline]
    pub const fn major_part(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % MINOR_PER_MAJOR).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Overflow-checked addition.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Overflow-checked subtraction.
    #[inline]
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Equality with a tolerance of one minor unit.
    ///
    /// Two independently rounded figures (an order total computed by the
    /// order service, and the sum of its posted entries) may legitimately
    /// differ by a single paisa. Anything larger is a real discrepancy.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// assert!(Money::from_minor(100).approx_eq(Money::from_minor(101)));
    /// assert!(!Money::from_minor(100).approx_eq(Money::from_minor(102)));
    /// ```
    #[inline]
    pub fn approx_eq(&self, other: Money) -> bool {
        (self.0 as i128 - other.0 as i128).abs() <= 1
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// Weighed goods are sold by the kilogram, so `quantity` is a Decimal.
    /// The exact product is rounded once, half-away-from-zero, to paise.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// // ₹45.50/kg × 1.235 kg = ₹56.19 (56.1925 rounded)
    /// let line = Money::multiply(Money::from_minor(4550), Decimal::new(1235, 3)).unwrap();
    /// assert_eq!(line.minor(), 5619);
    /// ```
    pub fn multiply(price: Money, quantity: Decimal) -> CoreResult<Money> {
        Decimal::from(price.0)
            .checked_mul(quantity)
            .map(|exact| exact.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|rounded| rounded.to_i64())
            .map(Money)
            .ok_or_else(|| CoreError::AmountOutOfRange(format!("{} × {}", price, quantity)))
    }

    /// Multiplies money by a whole quantity.
    ///
    /// ## Errors
    /// `CoreError::AmountOutOfRange` if the product does not fit in i64 paise.
    pub fn multiply_quantity(&self, qty: i64) -> CoreResult<Self> {
        self.0
            .checked_mul(qty)
            .map(Money)
            .ok_or_else(|| CoreError::AmountOutOfRange(format!("{} × {}", self, qty)))
    }

    /// Calculates tax on this amount, rounding half-away-from-zero.
    ///
    /// ## Implementation
    /// Integer math on basis points: `(|amount| × bps + 5000) / 10000`,
    /// with the sign re-applied afterwards so refunds round symmetrically.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    /// use khata_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_minor(10000); // ₹100.00
    /// let gst = subtotal.calculate_tax(TaxRate::from_bps(1800)).unwrap(); // 18%
    /// assert_eq!(gst.minor(), 1800);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> CoreResult<Money> {
        let magnitude = (self.0.unsigned_abs() as i128 * rate.bps() as i128 + 5000) / 10000;
        let signed = if self.0 < 0 { -magnitude } else { magnitude };
        i64::try_from(signed)
            .map(Money)
            .map_err(|_| CoreError::AmountOutOfRange(format!("tax on {}", self)))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================
//
// The operators follow i64 semantics and panic on overflow in debug builds.
// Code that sums caller-supplied amounts uses checked_add / checked_sub.

/// Display shows money as `₹1180.50` (for logs and errors, not UI).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}₹{}.{:02}",
            sign,
            self.major_part().abs(),
            self.minor_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_from_major_rounds_half_away_from_zero() {
        assert_eq!(Money::from_major(dec("118")).unwrap().minor(), 11800);
        assert_eq!(Money::from_major(dec("10.005")).unwrap().minor(), 1001);
        assert_eq!(Money::from_major(dec("10.004")).unwrap().minor(), 1000);
        assert_eq!(Money::from_major(dec("-10.005")).unwrap().minor(), -1001);
        assert_eq!(Money::from_major(dec("0.125")).unwrap().minor(), 13);
    }

    #[test]
    fn test_from_major_opt_none_is_zero() {
        assert_eq!(Money::from_major_opt(None).unwrap(), Money::zero());
        assert_eq!(
            Money::from_major_opt(Some(dec("2.50"))).unwrap().minor(),
            250
        );
    }

    #[test]
    fn test_from_major_overflow() {
        let huge = Decimal::MAX;
        assert!(matches!(
            Money::from_major(huge),
            Err(CoreError::AmountOutOfRange(_))
        ));
    }

    #[test]
    fn test_major_round_trip() {
        for text in ["0", "0.01", "0.1", "1180", "1180.50", "99999.99", "-42.07"] {
            let amount = dec(text);
            assert_eq!(Money::from_major(amount).unwrap().to_major(), amount, "{text}");
        }
    }

    #[test]
    fn test_to_major_has_two_places() {
        assert_eq!(Money::from_minor(500).to_major().to_string(), "5.00");
        assert_eq!(Money::from_minor(-7).to_major().to_string(), "-0.07");
    }

    #[test]
    fn test_decimal_sum_does_not_drift() {
        let a = Money::from_major(dec("0.1")).unwrap();
        let b = Money::from_major(dec("0.2")).unwrap();
        assert_eq!(a + b, Money::from_major(dec("0.3")).unwrap());
    }

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("₹1,180.50").unwrap().minor(), 118050);
        assert_eq!(Money::parse(" 42 ").unwrap().minor(), 4200);
        assert!(Money::parse("").is_err());
        assert!(Money::parse("abc").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(118050).to_string(), "₹1180.50");
        assert_eq!(Money::from_minor(500).to_string(), "₹5.00");
        assert_eq!(Money::from_minor(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((-a).minor(), -1000);

        let mut c = a;
        c += b;
        c -= Money::from_minor(200);
        assert_eq!(c.minor(), 1300);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.minor(), 2000);
    }

    #[test]
    fn test_checked_ops() {
        assert!(Money::from_minor(i64::MAX)
            .checked_add(Money::from_minor(1))
            .is_none());
        assert_eq!(
            Money::from_minor(5).checked_sub(Money::from_minor(7)),
            Some(Money::from_minor(-2))
        );
    }

    #[test]
    fn test_approx_eq() {
        let a = Money::from_minor(11800);
        assert!(a.approx_eq(a));
        assert!(a.approx_eq(Money::from_minor(11799)));
        assert!(a.approx_eq(Money::from_minor(11801)));
        assert!(!a.approx_eq(Money::from_minor(11802)));
    }

    #[test]
    fn test_multiply_fractional_quantity() {
        let price = Money::from_minor(4550);
        assert_eq!(Money::multiply(price, dec("1.235")).unwrap().minor(), 5619);
        assert_eq!(Money::multiply(price, dec("2")).unwrap().minor(), 9100);
        // 0.333 × ₹0.15 = 4.995 paise → 5
        assert_eq!(
            Money::multiply(Money::from_minor(15), dec("0.333")).unwrap().minor(),
            5
        );
        assert_eq!(price.multiply_quantity(3).unwrap().minor(), 13650);
    }

    #[test]
    fn test_whole_quantity_overflow_is_an_error() {
        assert!(matches!(
            Money::from_minor(i64::MAX).multiply_quantity(2),
            Err(CoreError::AmountOutOfRange(_))
        ));
        assert!(Money::from_minor(i64::MIN).multiply_quantity(-1).is_err());
    }

    #[test]
    fn test_calculate_tax() {
        let subtotal = Money::from_minor(10000);
        assert_eq!(subtotal.calculate_tax(TaxRate::from_bps(1800)).unwrap().minor(), 1800);

        // ₹10.99 at 5% = 54.95 paise → 55
        assert_eq!(
            Money::from_minor(1099).calculate_tax(TaxRate::from_bps(500)).unwrap().minor(),
            55
        );
        // Refund rounds symmetrically
        assert_eq!(
            Money::from_minor(-1099).calculate_tax(TaxRate::from_bps(500)).unwrap().minor(),
            -55
        );
        assert!(subtotal.calculate_tax(TaxRate::zero()).unwrap().is_zero());
    }

    #[test]
    fn test_calculate_tax_out_of_range() {
        // 200% of i64::MAX paise cannot be represented
        assert!(matches!(
            Money::from_minor(i64::MAX).calculate_tax(TaxRate::from_bps(20000)),
            Err(CoreError::AmountOutOfRange(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 1024,
            ..ProptestConfig::default()
        })]

        /// Any amount with at most two decimal places survives the trip
        /// through paise unchanged.
        #[test]
        fn major_round_trip_is_exact(
            mantissa in -1_000_000_000_000i64..1_000_000_000_000i64,
            scale in 0u32..=2,
        ) {
            let amount = Decimal::new(mantissa, scale);
            let money = Money::from_major(amount).unwrap();

            prop_assert_eq!(money.to_major(), amount);
            prop_assert_eq!(money.minor(), mantissa * 10i64.pow(CURRENCY_SCALE - scale));
        }

        /// Three-place amounts land on the nearest paisa.
        #[test]
        fn from_major_stays_within_half_a_paisa(mantissa in -1_000_000_000i64..1_000_000_000i64) {
            let amount = Decimal::new(mantissa, 3);
            let money = Money::from_major(amount).unwrap();

            prop_assert!((money.to_major() - amount).abs() <= Decimal::new(5, 3));
        }
    }
}
