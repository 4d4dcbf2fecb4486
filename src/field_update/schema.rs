use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Decimal,
    Integer,
    Date,
    Boolean,
}

/// Every editable contract field, named as it appears in update forms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, AsRefStr, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ContractField {
    SigningDate,
    Client,
    ContractNumber,
    ContractType,
    Collateral,
    Principal,
    InstallmentCount,
    InstallmentsRemaining,
    FirstDueDate,
    DownPayment,
    DiscountAmount,
    LegalFees,
    CourtCosts,
    Commission,
    ReceivedOn,
    InLitigation,
    Notes,
}

impl ContractField {
    pub fn kind(self) -> FieldKind {
        use ContractField::*;
        match self {
            Client | ContractNumber | ContractType | Collateral | Notes => FieldKind::Text,
            Principal | DownPayment | DiscountAmount | LegalFees | CourtCosts | Commission => {
                FieldKind::Decimal
            }
            InstallmentCount | InstallmentsRemaining => FieldKind::Integer,
            SigningDate | FirstDueDate | ReceivedOn => FieldKind::Date,
            InLitigation => FieldKind::Boolean,
        }
    }
}
