use super::ContractId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type InstallmentId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    // lookup only, the contract owns its installments
    pub contract_id: ContractId,
    pub sequence: u32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub paid: bool,
}

/// An installment produced by the schedule generator, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInstallment {
    pub sequence: u32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}
