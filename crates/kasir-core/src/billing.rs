//! # Billing Gate & Month Arithmetic
//!
//! Pure decision logic for the billing gate that fronts checkout, plus the
//! calendar helpers used by the monthly aggregator.
//!
//! ## The Gate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For each of the tenant's bills:                                        │
//! │                                                                         │
//! │    suspended ──────────────────────────► BLOCK (terminal message)       │
//! │    past_due  ──────────────────────────► BLOCK ("please pay")           │
//! │    unpaid AND day-of-month > 7 ────────► BLOCK ("please pay")           │
//! │    otherwise ──────────────────────────► checkout proceeds              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The decision is pure: the caller supplies today's date, which keeps the
//! day-7 rule unit-testable without a clock.

use chrono::{Datelike, Months, NaiveDate};

use crate::money::Money;
use crate::types::{BillingStatus, TenantBilling};

/// Day of month on which an unpaid invoice becomes blocking.
pub const BILLING_DUE_DAY: u32 = 7;

/// Late-payment penalty in basis points: 10%.
pub const PENALTY_BPS: u32 = 1_000;

/// User-facing message when the tenant is suspended.
pub const MSG_SUSPENDED: &str = "akun anda ditangguhkan karena menunggak tagihan MDR lebih \
     dari 1 bulan. Harap segera melunasi tagihan";

/// User-facing message when an invoice is past due.
pub const MSG_PAST_DUE: &str = "akses Kasir (POS) dibekukan sementara karena ada Tagihan MDR \
     yang melewati jatuh tempo (Tanggal 7). Harap bayar tagihan di menu Tagihan MDR";

/// Outcome of the billing gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Checkout may proceed.
    Allowed,
    /// Checkout is blocked; the message distinguishes "pay now" from
    /// "suspended".
    Blocked {
        message: &'static str,
        suspended: bool,
    },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }
}

/// Evaluates the billing gate over a tenant's outstanding bills.
///
/// A suspended bill blocks unconditionally; a past-due bill, or an unpaid
/// bill once the month's due day has passed, blocks with a "please pay"
/// message. Paid bills never block.
pub fn evaluate_gate(bills: &[TenantBilling], today: NaiveDate) -> GateDecision {
    for bill in bills {
        match bill.status {
            BillingStatus::Suspended => {
                return GateDecision::Blocked {
                    message: MSG_SUSPENDED,
                    suspended: true,
                };
            }
            BillingStatus::PastDue => {
                return GateDecision::Blocked {
                    message: MSG_PAST_DUE,
                    suspended: false,
                };
            }
            BillingStatus::Unpaid if today.day() > BILLING_DUE_DAY => {
                return GateDecision::Blocked {
                    message: MSG_PAST_DUE,
                    suspended: false,
                };
            }
            BillingStatus::Unpaid | BillingStatus::Paid => {}
        }
    }

    GateDecision::Allowed
}

/// The 10% penalty for paying an invoice after the due day.
pub fn late_penalty(total_fee: Money) -> Money {
    total_fee.percentage_bps(PENALTY_BPS)
}

/// Formats a date's month as a billing-month key, `MM-YYYY`.
pub fn billing_month_key(date: NaiveDate) -> String {
    format!("{:02}-{}", date.month(), date.year())
}

/// The calendar month preceding `today`: `(year, month, MM-YYYY key)`.
///
/// Running the aggregator on Feb 1st bills for January.
pub fn previous_month(today: NaiveDate) -> (i32, u32, String) {
    let last = today - Months::new(1);
    (last.year(), last.month(), billing_month_key(last))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bill(status: BillingStatus) -> TenantBilling {
        let now = Utc::now();
        TenantBilling {
            id: "bill-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            billing_month: "07-2026".to_string(),
            total_transactions: 12,
            total_fee: Money::from_minor(50_000),
            penalty_fee: Money::zero(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    #[test]
    fn test_no_bills_allows() {
        assert!(evaluate_gate(&[], day(20)).is_allowed());
    }

    #[test]
    fn test_unpaid_before_due_day_allows() {
        let bills = vec![bill(BillingStatus::Unpaid)];
        assert!(evaluate_gate(&bills, day(5)).is_allowed());
        assert!(evaluate_gate(&bills, day(7)).is_allowed());
    }

    #[test]
    fn test_unpaid_after_due_day_blocks() {
        let bills = vec![bill(BillingStatus::Unpaid)];
        match evaluate_gate(&bills, day(10)) {
            GateDecision::Blocked { message, suspended } => {
                assert_eq!(message, MSG_PAST_DUE);
                assert!(!suspended);
            }
            GateDecision::Allowed => panic!("expected block"),
        }
    }

    #[test]
    fn test_past_due_blocks_any_day() {
        let bills = vec![bill(BillingStatus::PastDue)];
        assert!(!evaluate_gate(&bills, day(2)).is_allowed());
    }

    #[test]
    fn test_suspended_blocks_terminally() {
        let bills = vec![bill(BillingStatus::Suspended)];
        match evaluate_gate(&bills, day(2)) {
            GateDecision::Blocked { message, suspended } => {
                assert_eq!(message, MSG_SUSPENDED);
                assert!(suspended);
            }
            GateDecision::Allowed => panic!("expected block"),
        }
    }

    #[test]
    fn test_paid_bills_never_block() {
        let bills = vec![bill(BillingStatus::Paid)];
        assert!(evaluate_gate(&bills, day(25)).is_allowed());
    }

    #[test]
    fn test_late_penalty() {
        assert_eq!(late_penalty(Money::from_minor(50_000)).minor(), 5_000);
    }

    #[test]
    fn test_billing_month_key() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 15).unwrap();
        assert_eq!(billing_month_key(date), "07-2026");
    }

    #[test]
    fn test_previous_month() {
        let feb_first = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert_eq!(previous_month(feb_first), (2026, 1, "01-2026".to_string()));

        // Year boundary
        let jan = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        assert_eq!(previous_month(jan), (2025, 12, "12-2025".to_string()));
    }
}
