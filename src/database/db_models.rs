use crate::error::{CreditError, Result};
use crate::models::{Contract, ContractTerms, Installment, NewInstallment};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use rust_decimal::Decimal;

// counters are INTEGER columns but u32 in the domain
pub(super) fn to_column(field: &str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| CreditError::invalid_value(field, value.to_string()))
}

fn from_column(field: &str, value: i32) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| CreditError::InvariantViolation(format!("negative {}: {}", field, value)))
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::contracts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContractRow {
    pub id: i64,
    pub signing_date: Option<NaiveDate>,
    pub client: Option<String>,
    pub contract_number: Option<String>,
    pub contract_type: Option<String>,
    pub collateral: Option<String>,
    pub principal: Option<Decimal>,
    pub installment_count: i32,
    pub installments_remaining: i32,
    pub first_due_date: Option<NaiveDate>,
    pub down_payment: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub legal_fees: Option<Decimal>,
    pub court_costs: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub received_on: Option<NaiveDate>,
    pub in_litigation: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column values for every editable field. Used both for inserts and, with
/// nulls written through, for full-row updates.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::contracts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct ContractValues<'a> {
    pub signing_date: Option<NaiveDate>,
    pub client: Option<&'a str>,
    pub contract_number: Option<&'a str>,
    pub contract_type: Option<&'a str>,
    pub collateral: Option<&'a str>,
    pub principal: Option<Decimal>,
    pub installment_count: i32,
    pub installments_remaining: i32,
    pub first_due_date: Option<NaiveDate>,
    pub down_payment: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub legal_fees: Option<Decimal>,
    pub court_costs: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub received_on: Option<NaiveDate>,
    pub in_litigation: bool,
    pub notes: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> ContractValues<'a> {
    pub fn new(terms: &'a ContractTerms, updated_at: DateTime<Utc>) -> Result<Self> {
        Ok(ContractValues {
            signing_date: terms.signing_date,
            client: terms.client.as_deref(),
            contract_number: terms.contract_number.as_deref(),
            contract_type: terms.contract_type.as_deref(),
            collateral: terms.collateral.as_deref(),
            principal: terms.principal,
            installment_count: to_column("installment_count", terms.installment_count)?,
            installments_remaining: to_column(
                "installments_remaining",
                terms.installments_remaining,
            )?,
            first_due_date: terms.first_due_date,
            down_payment: terms.down_payment,
            discount_amount: terms.discount_amount,
            legal_fees: terms.legal_fees,
            court_costs: terms.court_costs,
            commission: terms.commission,
            received_on: terms.received_on,
            in_litigation: terms.in_litigation,
            notes: terms.notes.as_deref(),
            updated_at,
        })
    }
}

impl TryFrom<ContractRow> for Contract {
    type Error = CreditError;

    fn try_from(row: ContractRow) -> Result<Contract> {
        Ok(Contract {
            id: row.id,
            terms: ContractTerms {
                signing_date: row.signing_date,
                client: row.client,
                contract_number: row.contract_number,
                contract_type: row.contract_type,
                collateral: row.collateral,
                principal: row.principal,
                installment_count: from_column("installment_count", row.installment_count)?,
                installments_remaining: from_column(
                    "installments_remaining",
                    row.installments_remaining,
                )?,
                first_due_date: row.first_due_date,
                down_payment: row.down_payment,
                discount_amount: row.discount_amount,
                legal_fees: row.legal_fees,
                court_costs: row.court_costs,
                commission: row.commission,
                received_on: row.received_on,
                in_litigation: row.in_litigation,
                notes: row.notes,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::installments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InstallmentRow {
    pub id: i64,
    pub contract_id: i64,
    pub sequence: i32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub paid: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::installments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewInstallmentRow {
    pub contract_id: i64,
    pub sequence: i32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

impl NewInstallmentRow {
    pub fn new(contract_id: i64, installment: &NewInstallment) -> Result<Self> {
        Ok(NewInstallmentRow {
            contract_id,
            sequence: to_column("sequence", installment.sequence)?,
            amount: installment.amount,
            due_date: installment.due_date,
        })
    }
}

impl TryFrom<InstallmentRow> for Installment {
    type Error = CreditError;

    fn try_from(row: InstallmentRow) -> Result<Installment> {
        Ok(Installment {
            id: row.id,
            contract_id: row.contract_id,
            sequence: from_column("sequence", row.sequence)?,
            amount: row.amount,
            due_date: row.due_date,
            paid: row.paid,
        })
    }
}
