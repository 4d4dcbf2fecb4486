use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type ContractId = i64;

/// The editable part of a contract. Every field here has a matching
/// `ContractField` entry in the update schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTerms {
    pub signing_date: Option<NaiveDate>,
    pub client: Option<String>,
    pub contract_number: Option<String>,
    pub contract_type: Option<String>,
    pub collateral: Option<String>,
    pub principal: Option<Decimal>,
    pub installment_count: u32,
    pub installments_remaining: u32,
    pub first_due_date: Option<NaiveDate>,

    // negotiated adjustments
    pub down_payment: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub legal_fees: Option<Decimal>,
    pub court_costs: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub received_on: Option<NaiveDate>,
    pub in_litigation: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    #[serde(flatten)]
    pub terms: ContractTerms,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContractTerms {
    /// Date the schedule starts from: the explicit first due date, or 30 days
    /// after signing when only the signing date is known.
    pub fn effective_start_date(&self) -> Option<NaiveDate> {
        self.first_due_date.or_else(|| {
            self.signing_date
                .map(|signed| signed + chrono::Duration::days(30))
        })
    }
}
