mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::field_update::ContractPatch;
use crate::models::{
    Contract, ContractId, ContractTerms, Installment, InstallmentId, NewInstallment, SettleOutcome,
};
use async_trait::async_trait;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

/// Persistence for contracts and the installments they own.
///
/// Every method that touches more than one record must apply its changes as
/// a unit: either everything is written or nothing is.
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Inserts a contract together with its schedule.
    async fn insert_contract(
        &self,
        terms: ContractTerms,
        schedule: Vec<NewInstallment>,
    ) -> Result<Contract>;

    async fn get_contract(&self, id: ContractId) -> Result<Option<Contract>>;

    /// All contracts, by id ascending.
    async fn list_contracts(&self) -> Result<Vec<Contract>>;

    /// Installments of one contract, by sequence ascending.
    async fn list_installments(&self, contract_id: ContractId) -> Result<Vec<Installment>>;

    /// Applies `patch` to the stored contract and returns the updated record.
    async fn update_contract(&self, id: ContractId, patch: &ContractPatch) -> Result<Contract>;

    /// Marks an installment paid and decrements its contract's remaining counter.
    async fn settle_installment(&self, id: InstallmentId) -> Result<SettleOutcome>;

    /// Deletes the given contracts and their installments. Unknown ids are skipped.
    async fn delete_contracts(&self, ids: &[ContractId]) -> Result<usize>;
}
