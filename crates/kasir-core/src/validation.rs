//! # Checkout Validation
//!
//! Early validation of checkout requests, run before any pricing or
//! persistence so a malformed cart never creates partial state.

use crate::error::{ValidationError, ValidationResult};
use crate::money::Money;
use crate::types::CheckoutRequest;

/// Maximum items allowed in a single cart.
///
/// Prevents runaway carts and keeps transaction sizes reasonable.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
/// Guards against typing 1000 instead of 10.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Validates the structural rules of a checkout request.
///
/// Pricing-dependent checks (unknown product, insufficient payment versus
/// the computed total) happen later in the orchestrator.
pub fn validate_checkout(request: &CheckoutRequest) -> ValidationResult<()> {
    if request.outlet_id.is_empty() {
        return Err(ValidationError::Required { field: "outlet_id" });
    }
    if request.items.is_empty() {
        return Err(ValidationError::EmptyItems);
    }
    if request.items.len() > MAX_CART_ITEMS {
        return Err(ValidationError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }
    if request.payments.is_empty() {
        return Err(ValidationError::EmptyPayments);
    }

    for item in &request.items {
        if item.product_id.is_empty() {
            return Err(ValidationError::Required { field: "product_id" });
        }
        if item.quantity <= 0 {
            return Err(ValidationError::NonPositiveQuantity {
                quantity: item.quantity,
            });
        }
        if item.quantity > MAX_LINE_QUANTITY {
            return Err(ValidationError::QuantityTooLarge {
                requested: item.quantity,
                max: MAX_LINE_QUANTITY,
            });
        }
    }

    for payment in &request.payments {
        if payment.amount <= Money::zero() {
            return Err(ValidationError::NonPositiveAmount {
                amount: payment.amount.minor(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckoutItemRequest, PaymentRequest};

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            outlet_id: "outlet-1".to_string(),
            customer_id: None,
            items: vec![CheckoutItemRequest {
                product_id: "prod-1".to_string(),
                variant_id: None,
                quantity: 2,
                modifiers: vec![],
                notes: None,
            }],
            payments: vec![PaymentRequest {
                channel: "cash".to_string(),
                amount: Money::from_minor(10_000),
                reference: None,
            }],
            notes: None,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        validate_checkout(&request()).unwrap();
    }

    #[test]
    fn test_empty_items_rejected() {
        let mut req = request();
        req.items.clear();
        assert!(matches!(
            validate_checkout(&req),
            Err(ValidationError::EmptyItems)
        ));
    }

    #[test]
    fn test_empty_payments_rejected() {
        let mut req = request();
        req.payments.clear();
        assert!(matches!(
            validate_checkout(&req),
            Err(ValidationError::EmptyPayments)
        ));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let mut req = request();
        req.items[0].quantity = 0;
        assert!(matches!(
            validate_checkout(&req),
            Err(ValidationError::NonPositiveQuantity { quantity: 0 })
        ));
    }

    #[test]
    fn test_oversized_quantity_rejected() {
        let mut req = request();
        req.items[0].quantity = 1_000;
        assert!(matches!(
            validate_checkout(&req),
            Err(ValidationError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_non_positive_payment_rejected() {
        let mut req = request();
        req.payments[0].amount = Money::zero();
        assert!(matches!(
            validate_checkout(&req),
            Err(ValidationError::NonPositiveAmount { amount: 0 })
        ));
    }
}
