//! Applies raw form edits to a contract.
//!
//! Edits arrive as a map of field name to raw string. The whole map is parsed
//! against the static `ContractField` schema into a `ContractPatch` first, so a
//! single bad value rejects the edit before anything is written.

mod schema;

pub use schema::*;

use crate::error::{CreditError, Result};
use crate::models::ContractTerms;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr as _;
use strum::{Display, EnumString, IntoEnumIterator as _};
use tracing::*;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// How an empty input is treated for non-boolean fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UpdateSemantics {
    /// Empty input clears the field (nullable fields become null, counters become 0).
    #[default]
    Replace,
    /// Empty input keeps the stored value.
    Preserve,
}

/// A parsed, typed form value. `None` means "clear".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(Option<String>),
    Decimal(Option<Decimal>),
    Integer(Option<u32>),
    Date(Option<NaiveDate>),
    Boolean(bool),
}

impl FieldValue {
    /// Coerces `raw` according to `field`'s declared kind. `raw` is `None` for
    /// a cleared value, or for an absent checkbox.
    pub fn parse(field: ContractField, raw: Option<&str>) -> Result<FieldValue> {
        let invalid = |v: &str| CreditError::invalid_value(field.as_ref(), v);
        Ok(match field.kind() {
            FieldKind::Text => FieldValue::Text(raw.map(str::to_string)),
            FieldKind::Decimal => FieldValue::Decimal(
                raw.map(|v| Decimal::from_str(v).map_err(|_| invalid(v)))
                    .transpose()?,
            ),
            FieldKind::Integer => FieldValue::Integer(
                raw.map(|v| v.parse::<u32>().map_err(|_| invalid(v)))
                    .transpose()?,
            ),
            FieldKind::Date => FieldValue::Date(
                raw.map(|v| NaiveDate::parse_from_str(v, DATE_FORMAT).map_err(|_| invalid(v)))
                    .transpose()?,
            ),
            FieldKind::Boolean => FieldValue::Boolean(raw.is_some_and(is_checked)),
        })
    }
}

fn is_checked(raw: &str) -> bool {
    !matches!(
        raw.to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "off" | "no"
    )
}

/// A set of field changes. Only the fields that are `Some` are applied.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ContractPatch {
    pub signing_date: Option<Option<NaiveDate>>,
    pub client: Option<Option<String>>,
    pub contract_number: Option<Option<String>>,
    pub contract_type: Option<Option<String>>,
    pub collateral: Option<Option<String>>,
    pub principal: Option<Option<Decimal>>,
    pub installment_count: Option<u32>,
    pub installments_remaining: Option<u32>,
    pub first_due_date: Option<Option<NaiveDate>>,
    pub down_payment: Option<Option<Decimal>>,
    pub discount_amount: Option<Option<Decimal>>,
    pub legal_fees: Option<Option<Decimal>>,
    pub court_costs: Option<Option<Decimal>>,
    pub commission: Option<Option<Decimal>>,
    pub received_on: Option<Option<NaiveDate>>,
    pub in_litigation: Option<bool>,
    pub notes: Option<Option<String>>,
}

macro_rules! for_each_patch_field {
    ($mac:ident!($($args:tt)*)) => {
        $mac!($($args)*;
            signing_date,
            client,
            contract_number,
            contract_type,
            collateral,
            principal,
            installment_count,
            installments_remaining,
            first_due_date,
            down_payment,
            discount_amount,
            legal_fees,
            court_costs,
            commission,
            received_on,
            in_litigation,
            notes
        )
    };
}

macro_rules! apply_fields {
    ($patch:ident, $terms:ident; $($field:ident),*) => {
        $(
            if let Some(value) = &$patch.$field {
                $terms.$field = value.clone();
            }
        )*
    };
}

macro_rules! debug_fields {
    ($patch:ident, $out:ident; $($field:ident),*) => {
        $(
            if let Some(value) = &$patch.$field {
                $out.push(format!("{}: {:?}", stringify!($field), value));
            }
        )*
    };
}

impl ContractPatch {
    /// Parses a raw form. Unknown keys are ignored; booleans follow checkbox
    /// semantics (absent means unchecked).
    pub fn from_form(form: &HashMap<String, String>, semantics: UpdateSemantics) -> Result<Self> {
        for name in form.keys() {
            if ContractField::from_str(name).is_err() {
                debug!("ignoring unknown contract field {:?}", name);
            }
        }

        let mut patch = ContractPatch::default();
        for field in ContractField::iter() {
            let raw = form.get(field.as_ref()).map(|v| v.trim());
            let raw = match (field.kind(), raw) {
                (FieldKind::Boolean, raw) => raw,
                (_, None) => continue,
                (_, Some("")) if semantics == UpdateSemantics::Preserve => continue,
                (_, Some("")) => None,
                (_, Some(v)) => Some(v),
            };
            patch.set(field, FieldValue::parse(field, raw)?)?;
        }
        Ok(patch)
    }

    pub fn set(&mut self, field: ContractField, value: FieldValue) -> Result<()> {
        use ContractField::*;
        use FieldValue as V;
        match (field, value) {
            (SigningDate, V::Date(v)) => self.signing_date = Some(v),
            (Client, V::Text(v)) => self.client = Some(v),
            (ContractNumber, V::Text(v)) => self.contract_number = Some(v),
            (ContractType, V::Text(v)) => self.contract_type = Some(v),
            (Collateral, V::Text(v)) => self.collateral = Some(v),
            (Principal, V::Decimal(v)) => self.principal = Some(v),
            (InstallmentCount, V::Integer(v)) => self.installment_count = Some(v.unwrap_or(0)),
            (InstallmentsRemaining, V::Integer(v)) => {
                self.installments_remaining = Some(v.unwrap_or(0))
            }
            (FirstDueDate, V::Date(v)) => self.first_due_date = Some(v),
            (DownPayment, V::Decimal(v)) => self.down_payment = Some(v),
            (DiscountAmount, V::Decimal(v)) => self.discount_amount = Some(v),
            (LegalFees, V::Decimal(v)) => self.legal_fees = Some(v),
            (CourtCosts, V::Decimal(v)) => self.court_costs = Some(v),
            (Commission, V::Decimal(v)) => self.commission = Some(v),
            (ReceivedOn, V::Date(v)) => self.received_on = Some(v),
            (InLitigation, V::Boolean(v)) => self.in_litigation = Some(v),
            (Notes, V::Text(v)) => self.notes = Some(v),
            (field, value) => {
                return Err(CreditError::InvariantViolation(format!(
                    "{} ({:?}) cannot hold {:?}",
                    field,
                    field.kind(),
                    value
                )))
            }
        }
        Ok(())
    }

    /// Writes the changed fields into `terms`. No cross-field checks are made;
    /// editing the installment count leaves the remaining counter alone.
    pub fn apply(&self, terms: &mut ContractTerms) {
        let patch = self;
        for_each_patch_field!(apply_fields!(patch, terms));
    }

    pub fn is_empty(&self) -> bool {
        *self == ContractPatch::default()
    }
}

impl std::fmt::Debug for ContractPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let patch = self;
        let mut fields: Vec<String> = Vec::new();
        for_each_patch_field!(debug_fields!(patch, fields));
        write!(f, "ContractPatch {{ {} }}", fields.join(", "))
    }
}
