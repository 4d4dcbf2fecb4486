mod contract;
mod installment;

pub use contract::*;
pub use installment::*;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleOutcome {
    Settled,
    AlreadyPaid,
}

/// A contract together with its schedule, as shown on the contract page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractDetail {
    pub contract: Contract,
    pub installments: Vec<Installment>,
    pub total_paid: Decimal,
}

/// One exported record per contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(flatten)]
    pub contract: Contract,
    pub total_paid: Decimal,
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{NaiveDate, TimeZone as _, Utc};
    use std::str::FromStr as _;

    #[test]
    fn test_effective_start_date() {
        let mut terms = ContractTerms {
            signing_date: Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
            ..Default::default()
        };
        assert_eq!(
            terms.effective_start_date(),
            Some(NaiveDate::from_ymd_opt(2024, 2, 14).unwrap())
        );

        terms.first_due_date = Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(terms.effective_start_date(), terms.first_due_date);

        assert_eq!(ContractTerms::default().effective_start_date(), None);
    }

    #[test]
    fn test_serialise_contract_flat() {
        let contract = Contract {
            id: 7,
            terms: ContractTerms {
                client: Some("ACME".to_string()),
                principal: Some(Decimal::from_str("1234.5").unwrap()),
                installment_count: 3,
                installments_remaining: 2,
                ..Default::default()
            },
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let val = serde_json::to_value(&contract).unwrap();
        assert_eq!(val["id"], 7);
        assert_eq!(val["client"], "ACME");
        assert_eq!(val["principal"], "1234.5");
        assert_eq!(val["installments_remaining"], 2);
        assert!(val["first_due_date"].is_null());

        let back: Contract = serde_json::from_value(val).unwrap();
        assert_eq!(back, contract);
    }
}
