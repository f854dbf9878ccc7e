//! Settlement sequencing tests
//!
//! Models the post-payment settlement contract: the invoice is created
//! before the payment is recorded, both before the order update, and a
//! failure at any step stops the sequence where it stands. Also covers the
//! order status transitions settlement and fulfilment rely on.

use shared::models::OrderStatus;

// ============================================================================
// Call-trace model of the settlement sequence
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettlementCall {
    CreateInvoice,
    RecordPayment,
    UpdateOrder,
    AllocateStock,
    Notify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailAt {
    Nowhere,
    Invoice,
    Payment,
    OrderUpdate,
    Allocation,
}

/// Run the settlement step sequence against a recording trace, stopping at
/// the first failing step. Notification is best-effort and never fails the
/// run.
fn run_settlement_sequence(fail_at: FailAt, trace: &mut Vec<SettlementCall>) -> Result<(), String> {
    trace.push(SettlementCall::CreateInvoice);
    if fail_at == FailAt::Invoice {
        return Err("invoice creation failed".to_string());
    }

    trace.push(SettlementCall::RecordPayment);
    if fail_at == FailAt::Payment {
        return Err("payment recording failed".to_string());
    }

    trace.push(SettlementCall::UpdateOrder);
    if fail_at == FailAt::OrderUpdate {
        return Err("order update failed".to_string());
    }

    trace.push(SettlementCall::AllocateStock);
    if fail_at == FailAt::Allocation {
        return Err("allocation failed".to_string());
    }

    trace.push(SettlementCall::Notify);
    Ok(())
}

fn position(trace: &[SettlementCall], call: SettlementCall) -> Option<usize> {
    trace.iter().position(|c| *c == call)
}

#[cfg(test)]
mod sequence_tests {
    use super::*;

    /// Successful settlement: invoice before payment, both before the order
    /// update, allocation after, notification last.
    #[test]
    fn test_successful_settlement_ordering() {
        let mut trace = Vec::new();
        run_settlement_sequence(FailAt::Nowhere, &mut trace).unwrap();

        let invoice = position(&trace, SettlementCall::CreateInvoice).unwrap();
        let payment = position(&trace, SettlementCall::RecordPayment).unwrap();
        let update = position(&trace, SettlementCall::UpdateOrder).unwrap();
        let allocate = position(&trace, SettlementCall::AllocateStock).unwrap();
        let notify = position(&trace, SettlementCall::Notify).unwrap();

        assert!(invoice < payment);
        assert!(payment < update);
        assert!(update < allocate);
        assert!(allocate < notify);
    }

    /// No payment may reference a nonexistent invoice: when invoice creation
    /// fails, payment recording is never attempted.
    #[test]
    fn test_invoice_failure_stops_before_payment() {
        let mut trace = Vec::new();
        let result = run_settlement_sequence(FailAt::Invoice, &mut trace);

        assert!(result.is_err());
        assert!(position(&trace, SettlementCall::RecordPayment).is_none());
        assert!(position(&trace, SettlementCall::UpdateOrder).is_none());
    }

    /// A payment failure leaves the order un-updated and stock untouched.
    #[test]
    fn test_payment_failure_stops_before_order_update() {
        let mut trace = Vec::new();
        let result = run_settlement_sequence(FailAt::Payment, &mut trace);

        assert!(result.is_err());
        assert!(position(&trace, SettlementCall::CreateInvoice).is_some());
        assert!(position(&trace, SettlementCall::UpdateOrder).is_none());
        assert!(position(&trace, SettlementCall::AllocateStock).is_none());
    }

    /// An order-update failure leaves the invoice and payment in the
    /// accounting system but never touches stock.
    #[test]
    fn test_order_update_failure_stops_before_allocation() {
        let mut trace = Vec::new();
        let result = run_settlement_sequence(FailAt::OrderUpdate, &mut trace);

        assert!(result.is_err());
        assert!(position(&trace, SettlementCall::RecordPayment).is_some());
        assert!(position(&trace, SettlementCall::AllocateStock).is_none());
    }

    /// An allocation failure happens after the order update; the earlier
    /// steps are already committed, which is exactly why the failure is
    /// recorded for manual reconciliation rather than rolled back.
    #[test]
    fn test_allocation_failure_preserves_invoice_steps() {
        let mut trace = Vec::new();
        let result = run_settlement_sequence(FailAt::Allocation, &mut trace);

        assert!(result.is_err());
        assert!(position(&trace, SettlementCall::CreateInvoice).is_some());
        assert!(position(&trace, SettlementCall::RecordPayment).is_some());
        assert!(position(&trace, SettlementCall::UpdateOrder).is_some());
        assert!(position(&trace, SettlementCall::Notify).is_none());
    }
}

// ============================================================================
// Order status transitions
// ============================================================================

#[cfg(test)]
mod status_tests {
    use super::*;

    /// Settlement moves a pending order to paid.
    #[test]
    fn test_settlement_transition() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
    }

    /// Fulfilment paths out of paid: shipped or ready for pickup, then
    /// completed.
    #[test]
    fn test_fulfilment_transitions() {
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::ReadyForPickup));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::ReadyForPickup.can_transition_to(OrderStatus::Completed));
    }

    /// An unpaid order cannot jump straight to fulfilment, and terminal
    /// orders never move again.
    #[test]
    fn test_invalid_transitions() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::ReadyForPickup));
    }

    /// Statuses survive the database round trip as text.
    #[test]
    fn test_status_text_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::ReadyForPickup,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
    }
}

// ============================================================================
// Invoice amount conversion
// ============================================================================

#[cfg(test)]
mod money_tests {
    use rust_decimal::Decimal;
    use shared::types::{cents_from_decimal_ceil, cents_to_decimal};

    /// Cent amounts become exact major-unit decimals on invoice lines.
    #[test]
    fn test_cents_to_major_units() {
        assert_eq!(cents_to_decimal(14900), Decimal::new(14900, 2));
        assert_eq!(cents_to_decimal(1), Decimal::new(1, 2));
        assert_eq!(cents_to_decimal(0), Decimal::ZERO);
    }

    /// A carrier price converted up to cents and back to major units never
    /// loses money.
    #[test]
    fn test_carrier_price_round_trip_never_cheaper() {
        for raw in ["10.60", "10.601", "0.005", "99.999"] {
            let price: Decimal = raw.parse().unwrap();
            let cents = cents_from_decimal_ceil(price).unwrap();
            assert!(cents_to_decimal(cents) >= price);
        }
    }
}
