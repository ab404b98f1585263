//! # Fee Calculator
//!
//! Pure computation of the Merchant Discount Rate (MDR) split per payment
//! channel. The gateway fee goes to the payment processor, the platform fee
//! is retained by the platform; their sum is the merchant-facing fee
//! deducted from the sale proceeds.
//!
//! ## Published rate table
//! ```text
//! ┌───────────────┬──────────────────┬──────────────┬──────────────────┐
//! │ channel       │ gateway          │ platform     │ merchant (comb.) │
//! ├───────────────┼──────────────────┼──────────────┼──────────────────┤
//! │ cash / other  │ 0                │ 0            │ 0                │
//! │ credit_card   │ 2.9% + 2000      │ 0.5%         │ 3.4% + 2000      │
//! │ qris          │ 0.7%             │ 0.5%         │ 1.2%             │
//! │ ewallet       │ 2.0%             │ 0.5%         │ 2.5%             │
//! │ bank_transfer │ 4000 flat        │ 1000 flat    │ 5000 flat        │
//! └───────────────┴──────────────────┴──────────────┴──────────────────┘
//! ```
//!
//! No side effects, no errors: an unrecognized channel simply carries no
//! MDR.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::PaymentChannel;

/// Platform margin on every non-cash channel: 0.5%.
const PLATFORM_BPS: u32 = 50;

/// The computed fee split for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Fee paid to the payment gateway.
    pub gateway_fee: Money,
    /// Fee retained by the platform.
    pub platform_fee: Money,
    /// Published combined rate in basis points (120 = 1.2%).
    pub rate_bps: u32,
    /// Published combined flat component.
    pub rate_flat: Money,
}

impl FeeBreakdown {
    /// The zero split (cash and unrecognized channels).
    pub const fn zero() -> Self {
        FeeBreakdown {
            gateway_fee: Money::zero(),
            platform_fee: Money::zero(),
            rate_bps: 0,
            rate_flat: Money::zero(),
        }
    }

    /// Combined merchant-facing fee: gateway + platform.
    pub fn combined(&self) -> Money {
        self.gateway_fee + self.platform_fee
    }
}

/// Computes the fee split for a payment channel and amount.
///
/// ## Example
/// ```rust
/// use kasir_core::fees::compute_fee;
/// use kasir_core::money::Money;
/// use kasir_core::types::PaymentChannel;
///
/// let fee = compute_fee(PaymentChannel::Qris, Money::from_minor(100_000));
/// assert_eq!(fee.gateway_fee.minor(), 700);
/// assert_eq!(fee.platform_fee.minor(), 500);
/// assert_eq!(fee.combined().minor(), 1_200);
/// ```
pub fn compute_fee(channel: PaymentChannel, amount: Money) -> FeeBreakdown {
    match channel {
        PaymentChannel::CreditCard => FeeBreakdown {
            gateway_fee: amount.percentage_bps(290) + Money::from_minor(2_000),
            platform_fee: amount.percentage_bps(PLATFORM_BPS),
            rate_bps: 340,
            rate_flat: Money::from_minor(2_000),
        },
        PaymentChannel::Qris => FeeBreakdown {
            gateway_fee: amount.percentage_bps(70),
            platform_fee: amount.percentage_bps(PLATFORM_BPS),
            rate_bps: 120,
            rate_flat: Money::zero(),
        },
        PaymentChannel::Ewallet => FeeBreakdown {
            gateway_fee: amount.percentage_bps(200),
            platform_fee: amount.percentage_bps(PLATFORM_BPS),
            rate_bps: 250,
            rate_flat: Money::zero(),
        },
        PaymentChannel::BankTransfer => FeeBreakdown {
            gateway_fee: Money::from_minor(4_000),
            platform_fee: Money::from_minor(1_000),
            rate_bps: 0,
            rate_flat: Money::from_minor(5_000),
        },
        // Cash and anything unrecognized carry no MDR.
        PaymentChannel::Cash | PaymentChannel::Other => FeeBreakdown::zero(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fee_for(raw: &str, amount: i64) -> FeeBreakdown {
        compute_fee(PaymentChannel::parse(raw), Money::from_minor(amount))
    }

    #[test]
    fn test_cash_has_no_fee() {
        let fee = fee_for("cash", 100_000);
        assert_eq!(fee, FeeBreakdown::zero());
        assert_eq!(fee.combined(), Money::zero());
    }

    #[test]
    fn test_unrecognized_channel_has_no_fee() {
        assert_eq!(fee_for("whatsapp", 100_000), FeeBreakdown::zero());
        assert_eq!(fee_for("store_credit", 50_000), FeeBreakdown::zero());
    }

    #[test]
    fn test_qris() {
        let fee = fee_for("qris", 100_000);
        assert_eq!(fee.gateway_fee.minor(), 700);
        assert_eq!(fee.platform_fee.minor(), 500);
        assert_eq!(fee.rate_bps, 120);
        assert_eq!(fee.rate_flat, Money::zero());
        assert_eq!(fee.combined().minor(), 1_200);
    }

    #[test]
    fn test_credit_card() {
        let fee = fee_for("credit_card", 100_000);
        assert_eq!(fee.gateway_fee.minor(), 2_000 + 2_900);
        assert_eq!(fee.platform_fee.minor(), 500);
        assert_eq!(fee.rate_bps, 340);
        assert_eq!(fee.rate_flat.minor(), 2_000);
    }

    #[test]
    fn test_ewallet_family() {
        for raw in ["gopay", "shopeepay", "dana", "ovo", "linkaja", "ewallet"] {
            let fee = fee_for(raw, 100_000);
            assert_eq!(fee.gateway_fee.minor(), 2_000, "channel {raw}");
            assert_eq!(fee.platform_fee.minor(), 500, "channel {raw}");
            assert_eq!(fee.rate_bps, 250, "channel {raw}");
        }
    }

    #[test]
    fn test_bank_transfer_flat() {
        for raw in ["bank_transfer", "virtual_account", "bca_va", "mandiri_va"] {
            let fee = fee_for(raw, 100_000);
            assert_eq!(fee.gateway_fee.minor(), 4_000, "channel {raw}");
            assert_eq!(fee.platform_fee.minor(), 1_000, "channel {raw}");
            assert_eq!(fee.rate_bps, 0, "channel {raw}");
            assert_eq!(fee.rate_flat.minor(), 5_000, "channel {raw}");
        }
    }

    #[test]
    fn test_channel_is_case_insensitive() {
        assert_eq!(fee_for("QRIS", 100_000), fee_for("qris", 100_000));
        assert_eq!(fee_for("GoPay", 100_000), fee_for("gopay", 100_000));
    }

    #[test]
    fn test_fee_on_pre_tax_subtotal() {
        // Checkout computes the fee on the pre-tax subtotal.
        let fee = fee_for("qris", 25_000);
        assert_eq!(fee.gateway_fee.minor(), 175);
        assert_eq!(fee.platform_fee.minor(), 125);
        assert_eq!(fee.combined().minor(), 300);
    }
}
