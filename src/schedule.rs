//! Installment schedule generation.
//!
//! A schedule splits the principal evenly over `count` installments due every
//! 30 days from the start date. The cadence is fixed and ignores calendar
//! months.

use crate::error::{CreditError, Result};
use crate::models::{ContractTerms, NewInstallment};
use chrono::{Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use strum::{Display, EnumString};

pub const DAYS_BETWEEN_INSTALLMENTS: i64 = 30;

/// Upper bound on installments per contract, a hundred years of monthly payments.
pub const MAX_INSTALLMENTS: u32 = 1200;

/// What to do with the cents lost when rounding `principal / count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RoundingPolicy {
    /// The last installment absorbs the remainder so the amounts add up to the principal.
    #[default]
    ReconcileLast,
    /// Every installment gets the rounded amount; the sum may be off by a few cents.
    Uniform,
}

/// Rounds half-up to cents.
fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Builds the installment schedule. An empty schedule is returned when
/// there is nothing to schedule yet (no principal, zero count or no start date).
///
/// The principal is rounded to cents before it is split, so every amount is
/// a whole number of cents and under `ReconcileLast` they add up to the
/// rounded principal.
pub fn generate_schedule(
    principal: Option<Decimal>,
    count: u32,
    start_date: Option<NaiveDate>,
    policy: RoundingPolicy,
) -> Result<Vec<NewInstallment>> {
    let (principal, start_date) = match (principal, start_date) {
        (Some(principal), Some(start_date)) if count > 0 && principal > Decimal::ZERO => {
            (round_cents(principal), start_date)
        }
        _ => return Ok(vec![]),
    };
    if count > MAX_INSTALLMENTS {
        return Err(CreditError::invalid_value(
            "installment_count",
            count.to_string(),
        ));
    }

    let base = round_cents(principal / Decimal::from(count));
    let last = match policy {
        RoundingPolicy::ReconcileLast => principal - base * Decimal::from(count - 1),
        RoundingPolicy::Uniform => base,
    };

    (1..=count)
        .map(|sequence| {
            let offset = Duration::days(DAYS_BETWEEN_INSTALLMENTS * (sequence as i64 - 1));
            let due_date = start_date
                .checked_add_signed(offset)
                .ok_or_else(|| CreditError::invalid_value("first_due_date", start_date.to_string()))?;
            Ok(NewInstallment {
                sequence,
                amount: if sequence == count { last } else { base },
                due_date,
            })
        })
        .collect()
}

/// Schedule for a contract about to be created.
pub fn schedule_for(terms: &ContractTerms, policy: RoundingPolicy) -> Result<Vec<NewInstallment>> {
    generate_schedule(
        terms.principal,
        terms.installment_count,
        terms.effective_start_date(),
        policy,
    )
}
