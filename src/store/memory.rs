use super::ContractStore;
use crate::error::{CreditError, Entity, Result};
use crate::field_update::ContractPatch;
use crate::models::{
    Contract, ContractId, ContractTerms, Installment, InstallmentId, NewInstallment, SettleOutcome,
};
use crate::settlement;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::*;

#[derive(Debug, Default)]
struct Tables {
    contracts: BTreeMap<ContractId, Contract>,
    installments: BTreeMap<InstallmentId, Installment>,
    next_contract_id: ContractId,
    next_installment_id: InstallmentId,
}

/// Keeps everything behind one mutex, so each call is a single critical
/// section. The lock is never held across an await point.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // every write happens after the last fallible step, so a poisoned lock still holds consistent tables
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ContractStore for MemoryStore {
    async fn insert_contract(
        &self,
        terms: ContractTerms,
        schedule: Vec<NewInstallment>,
    ) -> Result<Contract> {
        let mut tables = self.tables();
        tables.next_contract_id += 1;
        let now = Utc::now();
        let contract = Contract {
            id: tables.next_contract_id,
            terms,
            created_at: now,
            updated_at: now,
        };
        for new in schedule {
            tables.next_installment_id += 1;
            let installment = Installment {
                id: tables.next_installment_id,
                contract_id: contract.id,
                sequence: new.sequence,
                amount: new.amount,
                due_date: new.due_date,
                paid: false,
            };
            tables.installments.insert(installment.id, installment);
        }
        tables.contracts.insert(contract.id, contract.clone());
        debug!("memory store: inserted contract {}", contract.id);
        Ok(contract)
    }

    async fn get_contract(&self, id: ContractId) -> Result<Option<Contract>> {
        Ok(self.tables().contracts.get(&id).cloned())
    }

    async fn list_contracts(&self) -> Result<Vec<Contract>> {
        Ok(self.tables().contracts.values().cloned().collect())
    }

    async fn list_installments(&self, contract_id: ContractId) -> Result<Vec<Installment>> {
        let mut installments: Vec<Installment> = self
            .tables()
            .installments
            .values()
            .filter(|i| i.contract_id == contract_id)
            .cloned()
            .collect();
        installments.sort_by_key(|i| i.sequence);
        Ok(installments)
    }

    async fn update_contract(&self, id: ContractId, patch: &ContractPatch) -> Result<Contract> {
        let mut tables = self.tables();
        let contract = tables
            .contracts
            .get_mut(&id)
            .ok_or(CreditError::NotFound(Entity::Contract, id))?;
        patch.apply(&mut contract.terms);
        contract.updated_at = Utc::now();
        Ok(contract.clone())
    }

    async fn settle_installment(&self, id: InstallmentId) -> Result<SettleOutcome> {
        let mut tables = self.tables();
        let mut installment = tables
            .installments
            .get(&id)
            .cloned()
            .ok_or(CreditError::NotFound(Entity::Installment, id))?;
        let mut contract = tables.contracts.get(&installment.contract_id).cloned();

        // work on copies and write both back only once the transition succeeded
        let outcome = settlement::settle(&mut installment, contract.as_mut())?;
        if outcome == SettleOutcome::Settled {
            if let Some(mut contract) = contract {
                contract.updated_at = Utc::now();
                tables.contracts.insert(contract.id, contract);
            }
            tables.installments.insert(installment.id, installment);
        }
        Ok(outcome)
    }

    async fn delete_contracts(&self, ids: &[ContractId]) -> Result<usize> {
        let mut tables = self.tables();
        let mut deleted = 0;
        for id in ids {
            if tables.contracts.remove(id).is_some() {
                tables.installments.retain(|_, i| i.contract_id != *id);
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
