//! Installment settlement.
//!
//! An installment is either unpaid or paid and only ever moves from unpaid to
//! paid. The transition is applied by the stores to copies of the installment
//! and its contract, which are written back together only when it succeeds.

use crate::error::{CreditError, Result};
use crate::models::{Contract, Installment, SettleOutcome};
use rust_decimal::Decimal;
use tracing::*;

/// Marks `installment` paid and decrements the contract's remaining counter.
/// Settling an installment that is already paid leaves both records untouched.
pub fn settle(installment: &mut Installment, contract: Option<&mut Contract>) -> Result<SettleOutcome> {
    let contract = match contract {
        Some(contract) if contract.id == installment.contract_id => contract,
        _ => {
            warn!(
                "installment {} references missing contract {}",
                installment.id, installment.contract_id
            );
            return Err(CreditError::InvariantViolation(format!(
                "installment {} has no contract {}",
                installment.id, installment.contract_id
            )));
        }
    };

    if installment.paid {
        debug!("installment {} already paid", installment.id);
        return Ok(SettleOutcome::AlreadyPaid);
    }

    installment.paid = true;
    contract.terms.installments_remaining = contract.terms.installments_remaining.saturating_sub(1);
    Ok(SettleOutcome::Settled)
}

/// Sum of the paid installments.
pub fn total_paid<'a>(installments: impl IntoIterator<Item = &'a Installment>) -> Decimal {
    installments
        .into_iter()
        .filter(|i| i.paid)
        .map(|i| i.amount)
        .sum()
}
